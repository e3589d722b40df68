use std::collections::BTreeSet;

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use loft_domain::{
	AttributeLocks, AttributeProfile, EnrichmentMethod, Firmness, Material, SourceEvidence,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductProfileRecord {
	pub profile_id: Uuid,
	pub tenant_id: String,
	pub product_id: String,
	pub title: String,
	pub body: String,
	pub vendor: String,
	pub product_type: String,
	pub tags: Value,
	pub content_hash: String,
	pub firmness: Option<String>,
	pub height: Option<String>,
	pub material: Option<String>,
	pub certifications: Value,
	pub features: Value,
	pub support_features: Value,
	pub enrichment_method: String,
	pub confidence: f32,
	pub source_evidence: Value,
	pub model_version: Option<String>,
	pub locked_firmness: bool,
	pub locked_height: bool,
	pub locked_material: bool,
	pub locked_certifications: bool,
	pub locked_features: bool,
	pub locked_support_features: bool,
	pub price: Option<f64>,
	pub available_for_sale: bool,
	pub image_url: Option<String>,
	pub product_url: Option<String>,
	pub enriched_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl ProductProfileRecord {
	/// Rebuilds the typed profile from the exploded columns. Unknown enum
	/// values (from older writes) drop to None rather than failing the read.
	pub fn attribute_profile(&self) -> AttributeProfile {
		AttributeProfile {
			firmness: self
				.firmness
				.as_deref()
				.and_then(|value| serde_json::from_value::<Firmness>(Value::from(value)).ok()),
			height: self.height.clone(),
			material: self
				.material
				.as_deref()
				.and_then(|value| serde_json::from_value::<Material>(Value::from(value)).ok()),
			certifications: string_set(&self.certifications),
			features: string_set(&self.features),
			support_features: string_set(&self.support_features),
			enrichment_method: serde_json::from_value::<EnrichmentMethod>(Value::from(
				self.enrichment_method.as_str(),
			))
			.unwrap_or(EnrichmentMethod::Heuristic),
			confidence: self.confidence,
			source_evidence: serde_json::from_value::<Vec<SourceEvidence>>(
				self.source_evidence.clone(),
			)
			.unwrap_or_default(),
			model_version: self.model_version.clone(),
			locks: AttributeLocks {
				firmness: self.locked_firmness,
				height: self.locked_height,
				material: self.locked_material,
				certifications: self.locked_certifications,
				features: self.locked_features,
				support_features: self.locked_support_features,
			},
		}
	}

	pub fn tags_vec(&self) -> Vec<String> {
		self.tags
			.as_array()
			.map(|entries| {
				entries
					.iter()
					.filter_map(|entry| entry.as_str())
					.map(|entry| entry.to_string())
					.collect()
			})
			.unwrap_or_default()
	}
}

fn string_set(value: &Value) -> BTreeSet<String> {
	value
		.as_array()
		.map(|entries| {
			entries
				.iter()
				.filter_map(|entry| entry.as_str())
				.map(|entry| entry.to_string())
				.collect()
		})
		.unwrap_or_default()
}

pub(crate) fn set_to_json(set: &BTreeSet<String>) -> Value {
	Value::Array(set.iter().cloned().map(Value::from).collect())
}

pub(crate) fn method_str(method: EnrichmentMethod) -> &'static str {
	match method {
		EnrichmentMethod::Mapping => "mapping",
		EnrichmentMethod::Heuristic => "heuristic",
		EnrichmentMethod::Llm => "llm",
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IndexJobRecord {
	pub job_id: Uuid,
	pub tenant_id: String,
	pub status: String,
	pub total_products: i32,
	pub processed_products: i32,
	pub failed_products: i32,
	pub no_matches: bool,
	pub use_ai_enrichment: bool,
	pub use_web_search: bool,
	pub confidence_threshold: f32,
	pub error_message: Option<String>,
	pub created_at: OffsetDateTime,
	pub started_at: Option<OffsetDateTime>,
	pub finished_at: Option<OffsetDateTime>,
}
impl IndexJobRecord {
	pub fn is_terminal(&self) -> bool {
		matches!(self.status.as_str(), "completed" | "failed")
	}

	/// A non-terminal job that has been sitting past the threshold is
	/// abandoned; surfacing it is enough, recovery is external tooling.
	pub fn is_stale(&self, now: OffsetDateTime, threshold_minutes: i64) -> bool {
		if self.is_terminal() {
			return false;
		}

		let reference = self.started_at.unwrap_or(self.created_at);

		now - reference > time::Duration::minutes(threshold_minutes)
	}

	pub fn percent_complete(&self) -> f32 {
		if self.total_products <= 0 {
			return 0.0;
		}

		let done = (self.processed_products + self.failed_products) as f32;

		(done / self.total_products as f32 * 100.0).min(100.0)
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantCredentialsRecord {
	pub tenant_id: String,
	pub api_base: String,
	pub access_token: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
