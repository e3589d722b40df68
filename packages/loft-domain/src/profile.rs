use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Firmness {
	Soft,
	MediumSoft,
	Medium,
	MediumFirm,
	Firm,
}
impl Firmness {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Soft => "soft",
			Self::MediumSoft => "medium-soft",
			Self::Medium => "medium",
			Self::MediumFirm => "medium-firm",
			Self::Firm => "firm",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Material {
	MemoryFoam,
	Latex,
	Innerspring,
	Hybrid,
	GelFoam,
	Polyurethane,
}
impl Material {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::MemoryFoam => "memory-foam",
			Self::Latex => "latex",
			Self::Innerspring => "innerspring",
			Self::Hybrid => "hybrid",
			Self::GelFoam => "gel-foam",
			Self::Polyurethane => "polyurethane",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrichmentMethod {
	Mapping,
	Heuristic,
	Llm,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceEvidence {
	pub source: String,
	pub evidence: String,
	pub confidence: f32,
}

/// Per-attribute human-override flags. A locked attribute survives every
/// automated merge, whatever the incoming confidence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeLocks {
	pub firmness: bool,
	pub height: bool,
	pub material: bool,
	pub certifications: bool,
	pub features: bool,
	pub support_features: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeProfile {
	pub firmness: Option<Firmness>,
	pub height: Option<String>,
	pub material: Option<Material>,
	pub certifications: BTreeSet<String>,
	pub features: BTreeSet<String>,
	pub support_features: BTreeSet<String>,
	pub enrichment_method: EnrichmentMethod,
	pub confidence: f32,
	pub source_evidence: Vec<SourceEvidence>,
	pub model_version: Option<String>,
	pub locks: AttributeLocks,
}
impl Default for AttributeProfile {
	fn default() -> Self {
		Self {
			firmness: None,
			height: None,
			material: None,
			certifications: BTreeSet::new(),
			features: BTreeSet::new(),
			support_features: BTreeSet::new(),
			enrichment_method: EnrichmentMethod::Mapping,
			confidence: 0.0,
			source_evidence: Vec::new(),
			model_version: None,
			locks: AttributeLocks::default(),
		}
	}
}
impl AttributeProfile {
	pub fn is_empty(&self) -> bool {
		self.firmness.is_none()
			&& self.height.is_none()
			&& self.material.is_none()
			&& self.certifications.is_empty()
			&& self.features.is_empty()
			&& self.support_features.is_empty()
	}

	/// Folds `overlay` into `self`. Scalar attributes are overwritten only
	/// when the incoming profile carries strictly higher confidence (or the
	/// slot is empty); set attributes union; locked attributes never change.
	/// The resulting confidence is the maximum of both sides.
	pub fn apply(&mut self, overlay: Self) {
		let held = self.confidence;

		if !self.locks.firmness
			&& overlay.firmness.is_some()
			&& (self.firmness.is_none() || overlay.confidence > held)
		{
			self.firmness = overlay.firmness;
		}
		if !self.locks.height
			&& overlay.height.is_some()
			&& (self.height.is_none() || overlay.confidence > held)
		{
			self.height = overlay.height;
		}
		if !self.locks.material
			&& overlay.material.is_some()
			&& (self.material.is_none() || overlay.confidence > held)
		{
			self.material = overlay.material;
		}
		if !self.locks.certifications {
			self.certifications.extend(overlay.certifications);
		}
		if !self.locks.features {
			self.features.extend(overlay.features);
		}
		if !self.locks.support_features {
			self.support_features.extend(overlay.support_features);
		}
		if overlay.confidence > held {
			self.enrichment_method = overlay.enrichment_method;
		}
		if self.model_version.is_none() {
			self.model_version = overlay.model_version;
		}

		self.confidence = held.max(overlay.confidence);
		self.source_evidence.extend(overlay.source_evidence);
	}

	/// The textual rendition that gets embedded, assembled from the raw item
	/// fields plus every enriched attribute, in a fixed order.
	pub fn embedding_text(
		&self,
		title: &str,
		body: &str,
		vendor: &str,
		product_type: &str,
	) -> String {
		let mut parts = Vec::new();

		for raw in [title, body, vendor, product_type] {
			if !raw.trim().is_empty() {
				parts.push(raw.trim().to_string());
			}
		}
		if let Some(firmness) = self.firmness {
			parts.push(format!("Firmness: {}", firmness.as_str()));
		}
		if let Some(height) = self.height.as_deref() {
			parts.push(format!("Height: {height}"));
		}
		if let Some(material) = self.material {
			parts.push(format!("Material: {}", material.as_str()));
		}
		if !self.certifications.is_empty() {
			parts.push(format!(
				"Certifications: {}",
				self.certifications.iter().cloned().collect::<Vec<_>>().join(", ")
			));
		}
		if !self.features.is_empty() {
			parts.push(format!(
				"Features: {}",
				self.features.iter().cloned().collect::<Vec<_>>().join(", ")
			));
		}
		if !self.support_features.is_empty() {
			parts.push(format!(
				"Support: {}",
				self.support_features.iter().cloned().collect::<Vec<_>>().join(", ")
			));
		}

		parts.join(" | ")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn profile_with(
		firmness: Firmness,
		confidence: f32,
		method: EnrichmentMethod,
	) -> AttributeProfile {
		AttributeProfile {
			firmness: Some(firmness),
			confidence,
			enrichment_method: method,
			..Default::default()
		}
	}

	#[test]
	fn merge_keeps_highest_confidence_scalar() {
		let mut merged = AttributeProfile::default();

		merged.apply(profile_with(Firmness::Firm, 1.0, EnrichmentMethod::Mapping));
		merged.apply(profile_with(Firmness::Medium, 0.9, EnrichmentMethod::Llm));
		merged.apply(profile_with(Firmness::Soft, 0.8, EnrichmentMethod::Heuristic));
		merged.apply(profile_with(Firmness::MediumSoft, 0.4, EnrichmentMethod::Llm));

		assert_eq!(merged.firmness, Some(Firmness::Firm));
		assert_eq!(merged.confidence, 1.0);
		assert_eq!(merged.enrichment_method, EnrichmentMethod::Mapping);
	}

	#[test]
	fn merge_fills_empty_scalar_from_lower_confidence() {
		let mut merged = profile_with(Firmness::Firm, 1.0, EnrichmentMethod::Mapping);
		let mut overlay = AttributeProfile::default();

		overlay.height = Some("12 inches".to_string());
		overlay.confidence = 0.4;
		overlay.enrichment_method = EnrichmentMethod::Llm;

		merged.apply(overlay);

		assert_eq!(merged.height.as_deref(), Some("12 inches"));
		assert_eq!(merged.firmness, Some(Firmness::Firm));
		assert_eq!(merged.confidence, 1.0);
		assert_eq!(merged.enrichment_method, EnrichmentMethod::Mapping);
	}

	#[test]
	fn merge_unions_set_attributes_regardless_of_confidence() {
		let mut merged = AttributeProfile::default();

		merged.features.insert("cooling-gel".to_string());
		merged.confidence = 1.0;

		let mut overlay = AttributeProfile::default();

		overlay.features.insert("edge-support".to_string());
		overlay.certifications.insert("CertiPUR-US".to_string());
		overlay.confidence = 0.4;

		merged.apply(overlay);

		assert!(merged.features.contains("cooling-gel"));
		assert!(merged.features.contains("edge-support"));
		assert!(merged.certifications.contains("CertiPUR-US"));
	}

	#[test]
	fn locked_attribute_survives_higher_confidence_overlay() {
		let mut merged = profile_with(Firmness::Soft, 0.8, EnrichmentMethod::Heuristic);

		merged.locks.firmness = true;

		merged.apply(profile_with(Firmness::Firm, 1.0, EnrichmentMethod::Mapping));

		assert_eq!(merged.firmness, Some(Firmness::Soft));
		assert_eq!(merged.confidence, 1.0);
	}

	#[test]
	fn locked_set_attribute_rejects_union() {
		let mut merged = AttributeProfile::default();

		merged.features.insert("pressure-relief".to_string());
		merged.locks.features = true;

		let mut overlay = AttributeProfile::default();

		overlay.features.insert("cooling-gel".to_string());
		overlay.confidence = 1.0;

		merged.apply(overlay);

		assert_eq!(merged.features.len(), 1);
		assert!(merged.features.contains("pressure-relief"));
	}

	#[test]
	fn embedding_text_joins_fields_in_fixed_order() {
		let mut profile = AttributeProfile::default();

		profile.firmness = Some(Firmness::MediumFirm);
		profile.height = Some("12 inches".to_string());
		profile.features.insert("cooling-gel".to_string());

		let text = profile.embedding_text("Cloud Nine", "A mattress.", "Acme", "Mattress");

		assert_eq!(
			text,
			"Cloud Nine | A mattress. | Acme | Mattress | Firmness: medium-firm | \
			 Height: 12 inches | Features: cooling-gel"
		);
	}

	#[test]
	fn kebab_case_wire_form_round_trips() {
		let json = serde_json::to_string(&Firmness::MediumFirm).expect("serialize failed");

		assert_eq!(json, "\"medium-firm\"");

		let parsed: Material = serde_json::from_str("\"memory-foam\"").expect("parse failed");

		assert_eq!(parsed, Material::MemoryFoam);
	}
}
