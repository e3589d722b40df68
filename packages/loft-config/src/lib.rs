mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Catalog, Config, EmbeddingProviderConfig, Enrichment, Indexing, LlmProviderConfig,
	MappingOverrides, Postgres, Providers, Qdrant, Recommend, Retry, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.catalog.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "catalog.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.catalog.max_poll_attempts == 0 {
		return Err(Error::Validation {
			message: "catalog.max_poll_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.product_batch_size == 0 {
		return Err(Error::Validation {
			message: "indexing.product_batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.classification_batch_size == 0 {
		return Err(Error::Validation {
			message: "indexing.classification_batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.stale_job_minutes <= 0 {
		return Err(Error::Validation {
			message: "indexing.stale_job_minutes must be greater than zero.".to_string(),
		});
	}
	if cfg.indexing.worker_poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "indexing.worker_poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if !cfg.enrichment.confidence_threshold.is_finite() {
		return Err(Error::Validation {
			message: "enrichment.confidence_threshold must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.enrichment.confidence_threshold) {
		return Err(Error::Validation {
			message: "enrichment.confidence_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.recommend.default_top_k == 0 {
		return Err(Error::Validation {
			message: "recommend.default_top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.recommend.max_top_k < cfg.recommend.default_top_k {
		return Err(Error::Validation {
			message: "recommend.max_top_k must be at least recommend.default_top_k.".to_string(),
		});
	}
	if cfg.retry.max_attempts == 0 {
		return Err(Error::Validation {
			message: "retry.max_attempts must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.initial_delay_ms == 0 {
		return Err(Error::Validation {
			message: "retry.initial_delay_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.retry.max_delay_ms < cfg.retry.initial_delay_ms {
		return Err(Error::Validation {
			message: "retry.max_delay_ms must be at least retry.initial_delay_ms.".to_string(),
		});
	}
	if cfg.retry.backoff_multiplier == 0 {
		return Err(Error::Validation {
			message: "retry.backoff_multiplier must be greater than zero.".to_string(),
		});
	}

	for (label, provider_key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("enrichment", &cfg.providers.enrichment.api_key),
		("websearch", &cfg.providers.websearch.api_key),
		("classifier", &cfg.providers.classifier.api_key),
	] {
		if provider_key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}
