pub mod catalog;
pub mod classifier;
pub mod embedding;
pub mod enrich;
pub mod retry;
pub mod websearch;

use color_eyre::{Result, eyre};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();
	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(eyre::eyre!("Default header values must be strings."));
		};
		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}
	Ok(headers)
}

/// Pulls the assistant message content out of a chat-completion response and
/// parses it as JSON. Providers that return the object at the top level are
/// accepted as-is.
pub(crate) fn completion_json(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		let parsed: Value = serde_json::from_str(content)
			.map_err(|_| eyre::eyre!("Completion content is not valid JSON."))?;

		return Ok(parsed);
	}

	if json.is_object() || json.is_array() {
		return Ok(json);
	}

	Err(eyre::eyre!("Completion response is missing JSON content."))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_json() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "{\"firmness\": \"medium\"}" } }
			]
		});
		let parsed = completion_json(json).expect("parse failed");
		assert_eq!(parsed.get("firmness").and_then(|v| v.as_str()), Some("medium"));
	}

	#[test]
	fn rejects_non_json_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "the mattress is firm" } }
			]
		});
		assert!(completion_json(json).is_err());
	}
}
