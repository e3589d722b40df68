pub mod enrichment;
pub mod jobs;
pub mod profiles;
pub mod recommend;
pub mod time_serde;

use std::{future::Future, pin::Pin, sync::Arc};

pub use enrichment::{EnrichmentOptions, EnrichmentOutcome};
pub use jobs::{JobView, StartJobRequest};
use loft_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use loft_domain::{AttributeProfile, CatalogItem};
use loft_providers::{
	catalog::{CatalogAccess, ExportStatus},
	classifier, embedding, enrich, websearch,
};
use loft_storage::{
	db::Db,
	qdrant::{QdrantStore, ScoredRecord, SearchParams, StoreStats, VectorRecord},
};
pub use profiles::{ProfileEditRequest, ProfileView};
pub use recommend::{RecommendOptions, RecommendedProduct};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;

	fn dimensions(&self, cfg: &EmbeddingProviderConfig) -> u32 {
		cfg.dimensions
	}

	fn healthy<'a>(&'a self, cfg: &'a EmbeddingProviderConfig) -> BoxFuture<'a, bool> {
		Box::pin(async move {
			let probe = vec!["ping".to_string()];

			match self.embed(cfg, &probe).await {
				Ok(vectors) => vectors.first().map(|vec| !vec.is_empty()).unwrap_or(false),
				Err(_) => false,
			}
		})
	}
}

pub trait EnrichmentProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		item: &'a CatalogItem,
	) -> BoxFuture<'a, color_eyre::Result<AttributeProfile>>;
}

pub trait WebSearchProvider
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		item: &'a CatalogItem,
	) -> BoxFuture<'a, color_eyre::Result<AttributeProfile>>;
}

pub trait ClassifierProvider
where
	Self: Send + Sync,
{
	fn classify<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		items: &'a [CatalogItem],
	) -> BoxFuture<'a, color_eyre::Result<Vec<bool>>>;
}

pub trait CatalogSource
where
	Self: Send + Sync,
{
	fn start_bulk_export<'a>(
		&'a self,
		cfg: &'a loft_config::Catalog,
		access: &'a CatalogAccess,
	) -> BoxFuture<'a, color_eyre::Result<String>>;

	fn poll_bulk_export<'a>(
		&'a self,
		cfg: &'a loft_config::Catalog,
		access: &'a CatalogAccess,
		operation_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<ExportStatus>>;

	fn download_export<'a>(
		&'a self,
		cfg: &'a loft_config::Catalog,
		url: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait VectorStore
where
	Self: Send + Sync,
{
	fn upsert<'a>(&'a self, records: &'a [VectorRecord]) -> BoxFuture<'a, color_eyre::Result<()>>;

	fn search<'a>(
		&'a self,
		query: &'a [f32],
		params: &'a SearchParams,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ScoredRecord>>>;

	fn delete<'a>(&'a self, point_ids: &'a [uuid::Uuid]) -> BoxFuture<'a, color_eyre::Result<()>>;

	fn delete_by_tenant<'a>(&'a self, tenant_id: &'a str)
	-> BoxFuture<'a, color_eyre::Result<()>>;

	fn stats<'a>(&'a self) -> BoxFuture<'a, color_eyre::Result<StoreStats>>;

	fn healthy<'a>(&'a self) -> BoxFuture<'a, bool>;
}

#[derive(Debug)]
pub enum ServiceError {
	InvalidRequest { message: String },
	NotFound { message: String },
	Conflict { message: String },
	Provider { message: String },
	Storage { message: String },
	VectorStore { message: String },
}
impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::NotFound { message } => write!(f, "Not found: {message}"),
			Self::Conflict { message } => write!(f, "Conflict: {message}"),
			Self::Provider { message } => write!(f, "Provider error: {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
			Self::VectorStore { message } => write!(f, "Vector store error: {message}"),
		}
	}
}
impl std::error::Error for ServiceError {}
impl From<sqlx::Error> for ServiceError {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}
impl From<loft_storage::Error> for ServiceError {
	fn from(err: loft_storage::Error) -> Self {
		match err {
			loft_storage::Error::Conflict(message) => Self::Conflict { message },
			loft_storage::Error::NotFound(message) => Self::NotFound { message },
			loft_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			loft_storage::Error::Qdrant(err) => Self::VectorStore { message: err.to_string() },
			other => Self::Storage { message: other.to_string() },
		}
	}
}
impl From<color_eyre::Report> for ServiceError {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

/// Every outbound dependency as a constructor-injected port. One process
/// picks its implementations once; tests swap in dummies and spies.
#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub enrichment: Arc<dyn EnrichmentProvider>,
	pub websearch: Arc<dyn WebSearchProvider>,
	pub classifier: Arc<dyn ClassifierProvider>,
	pub catalog: Arc<dyn CatalogSource>,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}

	fn dimensions(&self, cfg: &EmbeddingProviderConfig) -> u32 {
		embedding::dimensions(cfg)
	}

	fn healthy<'a>(&'a self, cfg: &'a EmbeddingProviderConfig) -> BoxFuture<'a, bool> {
		Box::pin(embedding::healthy(cfg))
	}
}

impl EnrichmentProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		item: &'a CatalogItem,
	) -> BoxFuture<'a, color_eyre::Result<AttributeProfile>> {
		Box::pin(enrich::extract(cfg, item))
	}
}

impl WebSearchProvider for DefaultProviders {
	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		item: &'a CatalogItem,
	) -> BoxFuture<'a, color_eyre::Result<AttributeProfile>> {
		Box::pin(websearch::extract(cfg, item))
	}
}

impl ClassifierProvider for DefaultProviders {
	fn classify<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		items: &'a [CatalogItem],
	) -> BoxFuture<'a, color_eyre::Result<Vec<bool>>> {
		Box::pin(classifier::classify(cfg, items))
	}
}

impl CatalogSource for DefaultProviders {
	fn start_bulk_export<'a>(
		&'a self,
		cfg: &'a loft_config::Catalog,
		access: &'a CatalogAccess,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(loft_providers::catalog::start_bulk_export(cfg, access))
	}

	fn poll_bulk_export<'a>(
		&'a self,
		cfg: &'a loft_config::Catalog,
		access: &'a CatalogAccess,
		operation_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<ExportStatus>> {
		Box::pin(loft_providers::catalog::poll_bulk_export(cfg, access, operation_id))
	}

	fn download_export<'a>(
		&'a self,
		cfg: &'a loft_config::Catalog,
		url: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(loft_providers::catalog::download_export(cfg, url))
	}
}

impl VectorStore for QdrantStore {
	fn upsert<'a>(&'a self, records: &'a [VectorRecord]) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			self.upsert_records(records).await.map_err(|err| color_eyre::eyre::eyre!("{err}"))
		})
	}

	fn search<'a>(
		&'a self,
		query: &'a [f32],
		params: &'a SearchParams,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ScoredRecord>>> {
		Box::pin(async move {
			QdrantStore::search(self, query, params)
				.await
				.map_err(|err| color_eyre::eyre::eyre!("{err}"))
		})
	}

	fn delete<'a>(&'a self, point_ids: &'a [uuid::Uuid]) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			self.delete_points(point_ids).await.map_err(|err| color_eyre::eyre::eyre!("{err}"))
		})
	}

	fn delete_by_tenant<'a>(
		&'a self,
		tenant_id: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			QdrantStore::delete_by_tenant(self, tenant_id)
				.await
				.map_err(|err| color_eyre::eyre::eyre!("{err}"))
		})
	}

	fn stats<'a>(&'a self) -> BoxFuture<'a, color_eyre::Result<StoreStats>> {
		Box::pin(async move {
			QdrantStore::stats(self).await.map_err(|err| color_eyre::eyre::eyre!("{err}"))
		})
	}

	fn healthy<'a>(&'a self) -> BoxFuture<'a, bool> {
		Box::pin(QdrantStore::healthy(self))
	}
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		enrichment: Arc<dyn EnrichmentProvider>,
		websearch: Arc<dyn WebSearchProvider>,
		classifier: Arc<dyn ClassifierProvider>,
		catalog: Arc<dyn CatalogSource>,
	) -> Self {
		Self { embedding, enrichment, websearch, classifier, catalog }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			embedding: provider.clone(),
			enrichment: provider.clone(),
			websearch: provider.clone(),
			classifier: provider.clone(),
			catalog: provider,
		}
	}
}

pub struct LoftService {
	pub cfg: Config,
	pub db: Db,
	pub vectors: Arc<dyn VectorStore>,
	pub providers: Providers,
}
impl LoftService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		Self { cfg, db, vectors: Arc::new(qdrant), providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		db: Db,
		vectors: Arc<dyn VectorStore>,
		providers: Providers,
	) -> Self {
		Self { cfg, db, vectors, providers }
	}
}
