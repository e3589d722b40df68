use std::time::Duration;

use color_eyre::Result;
use reqwest::Client;
use serde_json::Value;

use loft_domain::{AttributeProfile, CatalogItem, EnrichmentMethod};

use crate::enrich::{populated_groups, profile_from_response};

/// Retrieval-augmented enrichment for items whose own data is too sparse.
/// Same output contract as the plain extractor, but findings originate from
/// independently verifiable sources, so cited evidence earns a larger bonus.
pub async fn extract(
	cfg: &loft_config::LlmProviderConfig,
	item: &CatalogItem,
) -> Result<AttributeProfile> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": build_messages(item),
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
	let mut profile = profile_from_response(&parsed);

	profile.enrichment_method = EnrichmentMethod::Llm;
	profile.confidence = search_confidence(&profile);
	profile.model_version = Some(format!("{}-websearch", cfg.model));

	tracing::info!(
		product_id = %item.id,
		confidence = profile.confidence,
		sources = profile.source_evidence.len(),
		"Web search enrichment completed."
	);

	Ok(profile)
}

fn build_messages(item: &CatalogItem) -> Value {
	let mut query = format!("\"{}\"", item.title);

	if !item.vendor.trim().is_empty() {
		query.push_str(&format!(" \"{}\"", item.vendor));
	}

	serde_json::json!([
		{
			"role": "system",
			"content": "You are a mattress product researcher. Use web search to find accurate \
				specifications from manufacturer websites, retailer pages, and review sites. \
				Respond with a single JSON object with the keys firmness, height, material, \
				certifications, features, support_features, and source_evidence. firmness must be \
				one of soft, medium-soft, medium, medium-firm, firm. material must be one of \
				memory-foam, latex, innerspring, hybrid, gel-foam, polyurethane. Every \
				source_evidence entry must cite the URL or site it came from. Use null for \
				anything you cannot verify.",
		},
		{
			"role": "user",
			"content": format!(
				"Search the web for specifications of this mattress: {query}\n\nLook for the \
				 firmness level, height in inches, material type, certifications, comfort \
				 features, and support features. Only include attributes you can verify from web \
				 sources, each with a quoted piece of evidence and a confidence between 0.0 and \
				 1.0."
			),
		},
	])
}

/// Base confidence stays low when the search found nothing; cited findings
/// score above same-shaped extractor output.
pub(crate) fn search_confidence(profile: &AttributeProfile) -> f32 {
	let populated = populated_groups(profile);

	if populated == 0 {
		return 0.3;
	}

	let field_confidence = populated as f32 / 6.0;
	let evidence_bonus = if profile.source_evidence.is_empty() { 0.0 } else { 0.3 };

	(field_confidence + evidence_bonus).min(1.0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use loft_domain::SourceEvidence;

	#[test]
	fn empty_search_result_keeps_base_confidence() {
		let profile = AttributeProfile::default();

		assert!((search_confidence(&profile) - 0.3).abs() < 1e-6);
	}

	#[test]
	fn cited_findings_outscore_uncited_ones() {
		let mut cited = AttributeProfile::default();

		cited.firmness = Some(loft_domain::Firmness::Firm);
		cited.source_evidence.push(SourceEvidence {
			source: "https://example.com/review".to_string(),
			evidence: "a firm mattress".to_string(),
			confidence: 0.9,
		});

		let mut uncited = AttributeProfile::default();

		uncited.firmness = Some(loft_domain::Firmness::Firm);

		assert!(search_confidence(&cited) > search_confidence(&uncited));
	}
}
