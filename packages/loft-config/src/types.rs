use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Tenant id -> logical attribute -> candidate structured-field keys.
pub type MappingOverrides = HashMap<String, HashMap<String, Vec<String>>>;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub catalog: Catalog,
	pub indexing: Indexing,
	pub enrichment: Enrichment,
	pub recommend: Recommend,
	pub retry: Retry,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub enrichment: LlmProviderConfig,
	pub websearch: LlmProviderConfig,
	pub classifier: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

/// Catalog source bulk-export contract. The per-tenant api_base and access
/// token live in storage; this section only shapes the polling behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
	pub poll_interval_ms: u64,
	pub max_poll_attempts: u32,
	pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Indexing {
	pub product_batch_size: u32,
	pub classification_batch_size: u32,
	pub max_uncertain_products: u32,
	pub batch_delay_ms: u64,
	pub classification_delay_ms: u64,
	pub stale_job_minutes: i64,
	pub worker_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Enrichment {
	pub use_ai_enrichment: bool,
	pub use_web_search: bool,
	pub confidence_threshold: f32,
	#[serde(default)]
	pub mapping_overrides: MappingOverrides,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Recommend {
	pub default_top_k: u32,
	pub max_top_k: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Retry {
	pub max_attempts: u32,
	pub initial_delay_ms: u64,
	pub max_delay_ms: u64,
	pub backoff_multiplier: u32,
}
