use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use loft_domain::{
	AttributeProfile, CatalogItem, EnrichmentMethod, Firmness, Material, SourceEvidence, mapping,
};

pub(crate) const ALLOWED_CERTIFICATIONS: [&str; 8] = [
	"CertiPUR-US",
	"OEKO-TEX",
	"GREENGUARD",
	"GOTS",
	"GOLS",
	"FSC",
	"Rainforest Alliance",
	"Cradle to Cradle",
];

pub(crate) const ALLOWED_FEATURES: [&str; 19] = [
	"cooling-gel",
	"pressure-relief",
	"motion-isolation",
	"edge-support",
	"zoned-support",
	"adjustable-firmness",
	"organic-materials",
	"hypoallergenic",
	"antimicrobial",
	"copper-infused",
	"graphite-infused",
	"bamboo-cover",
	"temperature-regulation",
	"moisture-wicking",
	"lumbar-support",
	"pillow-top",
	"euro-top",
	"tight-top",
	"platform-bed-compatible",
];

pub(crate) const ALLOWED_SUPPORT_FEATURES: [&str; 13] = [
	"pocketed-coils",
	"bonnell-coils",
	"continuous-coils",
	"offset-coils",
	"micro-coils",
	"high-coil-count",
	"perimeter-edge-support",
	"center-support-beam",
	"corner-guards",
	"reinforced-edges",
	"individual-pocket-springs",
	"tempered-steel-coils",
	"caliber-coil-system",
];

/// One structured-output completion per item. The response is constrained to
/// the closed attribute vocabulary; out-of-vocabulary values are dropped
/// field-by-field rather than failing the item.
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
	profile.confidence = response_confidence(&profile);
	profile.model_version = Some(cfg.model.clone());

	apply_fallback_defaults(&mut profile, item);

	Ok(profile)
}

fn build_messages(item: &CatalogItem) -> Value {
	let mut sections = vec![format!("Product Title: {}", item.title)];

	if !item.description.trim().is_empty() {
		sections.push(format!("Description: {}", item.description));
	}
	if !item.vendor.trim().is_empty() {
		sections.push(format!("Vendor: {}", item.vendor));
	}
	if !item.product_type.trim().is_empty() {
		sections.push(format!("Product Type: {}", item.product_type));
	}
	if !item.tags.is_empty() {
		sections.push(format!("Tags: {}", item.tags.join(", ")));
	}
	if !item.fields.is_empty() {
		let fields = item
			.fields
			.iter()
			.map(|field| format!("{}.{}: {}", field.namespace, field.key, field.value))
			.collect::<Vec<_>>()
			.join("\n");

		sections.push(format!("Structured fields:\n{fields}"));
	}

	serde_json::json!([
		{
			"role": "system",
			"content": "You are a mattress product expert. Extract ONLY factual mattress \
				attributes from the product data. Respond with a single JSON object with the keys \
				firmness, height, material, certifications, features, support_features, and \
				source_evidence. Use null for anything not clearly stated. firmness must be one of \
				soft, medium-soft, medium, medium-firm, firm. material must be one of memory-foam, \
				latex, innerspring, hybrid, gel-foam, polyurethane. source_evidence is an array of \
				{source, evidence, confidence} objects quoting the text each attribute came from.",
		},
		{
			"role": "user",
			"content": format!(
				"Analyze this mattress product and extract its attributes:\n\n{}\n\nOnly extract \
				 attributes that are explicitly mentioned or clearly inferable. Do not guess.",
				sections.join("\n\n")
			),
		},
	])
}

/// Lenient field-by-field validation: anything outside the closed
/// vocabulary is ignored, never fatal.
pub(crate) fn profile_from_response(parsed: &Value) -> AttributeProfile {
	let mut profile = AttributeProfile::default();

	profile.firmness = parsed
		.get("firmness")
		.cloned()
		.and_then(|value| serde_json::from_value::<Firmness>(value).ok());
	profile.height = parsed
		.get("height")
		.and_then(|value| value.as_str())
		.map(|value| value.to_string())
		.filter(|value| !value.trim().is_empty());
	profile.material = parsed
		.get("material")
		.cloned()
		.and_then(|value| serde_json::from_value::<Material>(value).ok());
	profile.certifications = allowed_strings(parsed.get("certifications"), &ALLOWED_CERTIFICATIONS);
	profile.features = allowed_strings(parsed.get("features"), &ALLOWED_FEATURES);
	profile.support_features =
		allowed_strings(parsed.get("support_features"), &ALLOWED_SUPPORT_FEATURES);

	if let Some(entries) = parsed.get("source_evidence").and_then(|value| value.as_array()) {
		for entry in entries {
			let Some(source) = entry.get("source").and_then(|value| value.as_str()) else {
				continue;
			};
			let Some(evidence) = entry.get("evidence").and_then(|value| value.as_str()) else {
				continue;
			};
			let confidence = entry
				.get("confidence")
				.and_then(|value| value.as_f64())
				.map(|value| value.clamp(0.0, 1.0) as f32)
				.unwrap_or(0.5);

			profile.source_evidence.push(SourceEvidence {
				source: source.to_string(),
				evidence: evidence.to_string(),
				confidence,
			});
		}
	}

	profile
}

fn allowed_strings(
	value: Option<&Value>,
	allowed: &[&str],
) -> std::collections::BTreeSet<String> {
	value
		.and_then(|value| value.as_array())
		.map(|entries| {
			entries
				.iter()
				.filter_map(|entry| entry.as_str())
				.filter(|entry| allowed.contains(entry))
				.map(|entry| entry.to_string())
				.collect()
		})
		.unwrap_or_default()
}

/// Confidence scales with how many of the six attribute groups the response
/// populated, plus a bonus when evidence came back with it.
pub(crate) fn response_confidence(profile: &AttributeProfile) -> f32 {
	let populated = populated_groups(profile);

	if populated == 0 {
		return 0.0;
	}

	let field_confidence = populated as f32 / 6.0;
	let evidence_bonus = if profile.source_evidence.is_empty() { 0.0 } else { 0.2 };

	(field_confidence + evidence_bonus).min(1.0)
}

pub(crate) fn populated_groups(profile: &AttributeProfile) -> usize {
	[
		profile.firmness.is_some(),
		profile.height.is_some(),
		profile.material.is_some(),
		!profile.certifications.is_empty(),
		!profile.features.is_empty(),
		!profile.support_features.is_empty(),
	]
	.into_iter()
	.filter(|populated| *populated)
	.count()
}

/// Never hand back a profile with zero signal: missing core scalars get
/// documented defaults, and an all-default profile keeps a low floor
/// confidence so it can only ever fill gaps.
fn apply_fallback_defaults(profile: &mut AttributeProfile, item: &CatalogItem) {
	if profile.firmness.is_none() {
		profile.firmness = Some(Firmness::Medium);
	}
	if profile.height.is_none() {
		profile.height = Some("10-14 inches".to_string());
	}
	if profile.material.is_none() {
		profile.material = mapping::normalize_material(&item.title);
	}
	if profile.confidence == 0.0 {
		profile.confidence = 0.25;
	}
}
