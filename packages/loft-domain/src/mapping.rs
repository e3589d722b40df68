use std::collections::HashMap;

use regex::Regex;

use crate::{
	item::CatalogItem,
	profile::{AttributeProfile, EnrichmentMethod, Firmness, Material, SourceEvidence},
};

const FIRMNESS_KEYS: [&str; 4] = ["firmness", "comfort_level", "feel", "softness_rating"];
const HEIGHT_KEYS: [&str; 4] = ["height", "thickness", "depth", "profile_height"];
const MATERIAL_KEYS: [&str; 4] = ["material", "construction", "foam_type", "core_material"];
const CERTIFICATION_KEYS: [&str; 4] = ["certifications", "certification", "certified_by", "standards"];

/// Extracts attributes from explicit structured fields. Pure, no network
/// calls; confidence is 1.0 whenever any attribute was found.
pub struct DeterministicMapper {
	firmness_keys: Vec<String>,
	height_keys: Vec<String>,
	material_keys: Vec<String>,
	certification_keys: Vec<String>,
}
impl Default for DeterministicMapper {
	fn default() -> Self {
		Self {
			firmness_keys: FIRMNESS_KEYS.iter().map(|key| key.to_string()).collect(),
			height_keys: HEIGHT_KEYS.iter().map(|key| key.to_string()).collect(),
			material_keys: MATERIAL_KEYS.iter().map(|key| key.to_string()).collect(),
			certification_keys: CERTIFICATION_KEYS.iter().map(|key| key.to_string()).collect(),
		}
	}
}
impl DeterministicMapper {
	/// Tenant overrides replace the candidate key list per logical attribute.
	pub fn with_overrides(overrides: &HashMap<String, Vec<String>>) -> Self {
		let mut mapper = Self::default();

		if let Some(keys) = overrides.get("firmness") {
			mapper.firmness_keys = keys.clone();
		}
		if let Some(keys) = overrides.get("height") {
			mapper.height_keys = keys.clone();
		}
		if let Some(keys) = overrides.get("material") {
			mapper.material_keys = keys.clone();
		}
		if let Some(keys) = overrides.get("certifications") {
			mapper.certification_keys = keys.clone();
		}

		mapper
	}

	pub fn extract(&self, item: &CatalogItem) -> AttributeProfile {
		let field_map = field_map(item);
		let mut profile = AttributeProfile::default();

		profile.enrichment_method = EnrichmentMethod::Mapping;

		if let Some((key, raw)) = first_value(&field_map, &self.firmness_keys)
			&& let Some(firmness) = normalize_firmness(raw)
		{
			profile.firmness = Some(firmness);
			profile.source_evidence.push(evidence(key, raw));
		}
		if let Some((key, raw)) = first_value(&field_map, &self.height_keys)
			&& let Some(height) = normalize_height(raw)
		{
			profile.height = Some(height);
			profile.source_evidence.push(evidence(key, raw));
		}
		if let Some((key, raw)) = first_value(&field_map, &self.material_keys)
			&& let Some(material) = normalize_material(raw)
		{
			profile.material = Some(material);
			profile.source_evidence.push(evidence(key, raw));
		}
		if let Some((key, raw)) = first_value(&field_map, &self.certification_keys) {
			let certifications = parse_certifications(raw);

			if !certifications.is_empty() {
				profile.certifications.extend(certifications);
				profile.source_evidence.push(evidence(key, raw));
			}
		}

		for tag in &item.tags {
			if let Some(feature) = tag_feature(&tag.to_lowercase()) {
				profile.features.insert(feature.to_string());
			}
		}
		for feature in description_features(&item.description.to_lowercase()) {
			profile.features.insert(feature.to_string());
		}

		if !profile.is_empty() {
			profile.confidence = 1.0;
		}

		profile
	}
}

/// Structured fields are addressable both by bare key and by the
/// namespace-qualified form; the first occurrence of a key wins.
fn field_map(item: &CatalogItem) -> HashMap<String, String> {
	let mut map = HashMap::new();

	for field in &item.fields {
		let qualified = format!("{}.{}", field.namespace, field.key).to_lowercase();
		let bare = field.key.to_lowercase();

		map.entry(qualified).or_insert_with(|| field.value.clone());
		map.entry(bare).or_insert_with(|| field.value.clone());
	}

	map
}

fn first_value<'a>(
	field_map: &'a HashMap<String, String>,
	keys: &'a [String],
) -> Option<(&'a str, &'a str)> {
	keys.iter().find_map(|key| {
		field_map
			.get(&key.to_lowercase())
			.filter(|value| !value.trim().is_empty())
			.map(|value| (key.as_str(), value.as_str()))
	})
}

fn evidence(key: &str, raw: &str) -> SourceEvidence {
	SourceEvidence {
		source: format!("field:{key}"),
		evidence: raw.to_string(),
		confidence: 1.0,
	}
}

pub fn normalize_firmness(value: &str) -> Option<Firmness> {
	let normalized = value.to_lowercase();

	// Compound levels first so "medium firm" does not resolve to medium.
	if normalized.contains("medium soft")
		|| normalized.contains("medium-soft")
		|| normalized.contains("medium plush")
	{
		return Some(Firmness::MediumSoft);
	}
	if normalized.contains("medium firm")
		|| normalized.contains("medium-firm")
		|| normalized.contains("firm medium")
	{
		return Some(Firmness::MediumFirm);
	}
	if normalized.contains("soft") || normalized.contains("plush") {
		return Some(Firmness::Soft);
	}
	if normalized.contains("firm") {
		return Some(Firmness::Firm);
	}
	if normalized.contains("medium") {
		return Some(Firmness::Medium);
	}

	None
}

pub fn normalize_height(value: &str) -> Option<String> {
	let pattern = Regex::new(r"(\d+(?:\.\d+)?)\s*(inches|inch|in|centimeters|centimeter|cm)?").ok()?;
	let lowercased = value.to_lowercase();
	let captures = pattern.captures(&lowercased)?;
	let number: f64 = captures.get(1)?.as_str().parse().ok()?;
	let unit = captures.get(2).map(|m| m.as_str()).unwrap_or("inches");

	if unit.starts_with('c') {
		let inches = (number / 2.54).round() as i64;

		return Some(format!("{inches} inches"));
	}
	if number.fract() == 0.0 {
		return Some(format!("{} inches", number as i64));
	}

	Some(format!("{number} inches"))
}

pub fn normalize_material(value: &str) -> Option<Material> {
	let normalized = value.to_lowercase();

	if normalized.contains("memory foam") || normalized.contains("memory-foam") {
		return Some(Material::MemoryFoam);
	}
	if normalized.contains("gel foam") || normalized.contains("gel-foam") {
		return Some(Material::GelFoam);
	}
	if normalized.contains("latex") {
		return Some(Material::Latex);
	}
	if normalized.contains("hybrid")
		|| (normalized.contains("foam") && normalized.contains("coil"))
	{
		return Some(Material::Hybrid);
	}
	if normalized.contains("innerspring")
		|| normalized.contains("coil")
		|| normalized.contains("spring")
	{
		return Some(Material::Innerspring);
	}
	if normalized.contains("polyurethane") {
		return Some(Material::Polyurethane);
	}

	None
}

pub fn parse_certifications(value: &str) -> Vec<String> {
	let normalized = value.to_lowercase();
	let mut certifications = Vec::new();

	if normalized.contains("certipur") || normalized.contains("certi-pur") {
		certifications.push("CertiPUR-US".to_string());
	}
	if normalized.contains("oeko") {
		certifications.push("OEKO-TEX".to_string());
	}
	if normalized.contains("greenguard") {
		certifications.push("GREENGUARD".to_string());
	}
	if normalized.contains("gols") || normalized.contains("global organic latex") {
		certifications.push("GOLS".to_string());
	} else if normalized.contains("gots") || normalized.contains("global organic") {
		certifications.push("GOTS".to_string());
	}

	certifications
}

fn tag_feature(tag: &str) -> Option<&'static str> {
	let feature = match tag {
		"cooling" | "gel" => "cooling-gel",
		"pressure relief" => "pressure-relief",
		"motion isolation" => "motion-isolation",
		"edge support" => "edge-support",
		"zoned" => "zoned-support",
		"organic" => "organic-materials",
		"hypoallergenic" => "hypoallergenic",
		"antimicrobial" => "antimicrobial",
		"copper" => "copper-infused",
		"graphite" => "graphite-infused",
		"bamboo" => "bamboo-cover",
		"temperature" => "temperature-regulation",
		"moisture" => "moisture-wicking",
		"lumbar" => "lumbar-support",
		"pillow top" => "pillow-top",
		"euro top" => "euro-top",
		_ => return None,
	};

	Some(feature)
}

fn description_features(description: &str) -> Vec<&'static str> {
	let detectors = [
		(r"\b(gel|cooling|pcm|graphite|copper|temperature|breathable)\b", "cooling-gel"),
		(r"\b(pressure.relief|contour|body.conforming|memory.foam)\b", "pressure-relief"),
		(r"\b(motion.isolation|motion.transfer|partner.disturbance)\b", "motion-isolation"),
		(r"\b(edge.support|perimeter|edge.to.edge|sitting.edge)\b", "edge-support"),
		(r"\b(zoned|zone|targeted.support|variable.firmness)\b", "zoned-support"),
	];
	let mut features = Vec::new();

	for (pattern, feature) in detectors {
		if Regex::new(pattern).map(|detector| detector.is_match(description)).unwrap_or(false) {
			features.push(feature);
		}
	}

	features
}
