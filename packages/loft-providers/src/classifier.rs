use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use loft_domain::CatalogItem;

/// Stage 2 of domain classification: one boolean per uncertain item, in
/// request order. A response of the wrong length is an error — the caller
/// excludes the whole batch rather than guessing the alignment.
pub async fn classify(
	cfg: &loft_config::LlmProviderConfig,
	items: &[CatalogItem],
) -> Result<Vec<bool>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": build_messages(items),
		"response_format": { "type": "json_object" },
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let parsed = crate::completion_json(json)?;

	parse_verdicts(&parsed, items.len())
}

fn build_messages(items: &[CatalogItem]) -> Value {
	let listing: Vec<Value> = items
		.iter()
		.map(|item| {
			serde_json::json!({
				"title": item.title,
				"product_type": item.product_type,
				"tags": item.tags,
			})
		})
		.collect();

	serde_json::json!([
		{
			"role": "system",
			"content": "You decide whether catalog products are mattresses. Accessories such as \
				toppers, protectors, pillows, sheets, frames, and foundations are not mattresses. \
				Respond with a JSON object {\"verdicts\": [...]} containing exactly one boolean \
				per product, in the same order as the input.",
		},
		{
			"role": "user",
			"content": serde_json::to_string(&listing).unwrap_or_default(),
		},
	])
}

pub(crate) fn parse_verdicts(parsed: &Value, expected: usize) -> Result<Vec<bool>> {
	let verdicts = parsed
		.get("verdicts")
		.and_then(|value| value.as_array())
		.or_else(|| parsed.as_array())
		.ok_or_else(|| eyre::eyre!("Classifier response is missing a verdicts array."))?;

	if verdicts.len() != expected {
		return Err(eyre::eyre!(
			"Classifier returned {} verdicts for {} items.",
			verdicts.len(),
			expected
		));
	}

	let mut out = Vec::with_capacity(verdicts.len());

	for verdict in verdicts {
		let value = verdict
			.as_bool()
			.ok_or_else(|| eyre::eyre!("Classifier verdicts must be booleans."))?;

		out.push(value);
	}

	Ok(out)
}
