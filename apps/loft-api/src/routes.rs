use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use loft_domain::ShopperIntent;
use loft_service::{
	JobView, ProfileEditRequest, ProfileView, RecommendOptions, RecommendedProduct,
	ServiceError, StartJobRequest,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/index/start", post(start_indexing))
		.route("/v1/index/stop", post(stop_indexing))
		.route("/v1/index/status", get(indexing_status))
		.route("/v1/index/jobs", get(recent_jobs))
		.route("/v1/recommendations", post(recommendations))
		.route("/v1/profiles", get(list_profiles))
		.route(
			"/v1/profiles/{profile_id}",
			get(get_profile).patch(edit_profile).delete(delete_profile),
		)
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/credentials", put(set_credentials))
		.route("/v1/admin/vectors/purge", post(purge_vectors))
		.route("/v1/admin/stats", get(store_stats))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct StartIndexingBody {
	tenant_id: String,
	#[serde(flatten)]
	request: StartJobRequest,
}

async fn start_indexing(
	State(state): State<AppState>,
	Json(payload): Json<StartIndexingBody>,
) -> Result<Json<JobView>, ApiError> {
	let view = state.service.start_indexing(&payload.tenant_id, payload.request).await?;
	Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct TenantBody {
	tenant_id: String,
}

async fn stop_indexing(
	State(state): State<AppState>,
	Json(payload): Json<TenantBody>,
) -> Result<Json<JobView>, ApiError> {
	let view = state.service.stop_indexing(&payload.tenant_id).await?;
	Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct TenantQuery {
	tenant_id: String,
	#[serde(default)]
	limit: Option<i64>,
	#[serde(default)]
	offset: Option<i64>,
}

async fn indexing_status(
	State(state): State<AppState>,
	Query(query): Query<TenantQuery>,
) -> Result<Json<Option<JobView>>, ApiError> {
	let view = state.service.indexing_status(&query.tenant_id).await?;
	Ok(Json(view))
}

async fn recent_jobs(
	State(state): State<AppState>,
	Query(query): Query<TenantQuery>,
) -> Result<Json<Vec<JobView>>, ApiError> {
	let views =
		state.service.recent_jobs(&query.tenant_id, query.limit.unwrap_or(10)).await?;
	Ok(Json(views))
}

#[derive(Debug, Deserialize)]
struct RecommendationBody {
	tenant_id: String,
	intent: ShopperIntent,
	#[serde(flatten)]
	options: RecommendOptions,
}

async fn recommendations(
	State(state): State<AppState>,
	Json(payload): Json<RecommendationBody>,
) -> Result<Json<Vec<RecommendedProduct>>, ApiError> {
	let products = state
		.service
		.recommend(&payload.tenant_id, &payload.intent, payload.options)
		.await?;
	Ok(Json(products))
}

async fn list_profiles(
	State(state): State<AppState>,
	Query(query): Query<TenantQuery>,
) -> Result<Json<Vec<ProfileView>>, ApiError> {
	let views = state
		.service
		.list_profiles(&query.tenant_id, query.limit.unwrap_or(50), query.offset.unwrap_or(0))
		.await?;
	Ok(Json(views))
}

async fn get_profile(
	State(state): State<AppState>,
	Path(profile_id): Path<Uuid>,
) -> Result<Json<ProfileView>, ApiError> {
	let view = state.service.get_profile(profile_id).await?;
	Ok(Json(view))
}

async fn edit_profile(
	State(state): State<AppState>,
	Path(profile_id): Path<Uuid>,
	Json(payload): Json<ProfileEditRequest>,
) -> Result<Json<ProfileView>, ApiError> {
	let view = state.service.edit_profile(profile_id, payload).await?;
	Ok(Json(view))
}

async fn delete_profile(
	State(state): State<AppState>,
	Path(profile_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
	state.service.delete_profile(profile_id).await?;
	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CredentialsBody {
	tenant_id: String,
	api_base: String,
	access_token: String,
}

async fn set_credentials(
	State(state): State<AppState>,
	Json(payload): Json<CredentialsBody>,
) -> Result<StatusCode, ApiError> {
	state
		.service
		.set_credentials(&payload.tenant_id, &payload.api_base, &payload.access_token)
		.await?;
	Ok(StatusCode::NO_CONTENT)
}

async fn purge_vectors(
	State(state): State<AppState>,
	Json(payload): Json<TenantBody>,
) -> Result<StatusCode, ApiError> {
	state
		.service
		.vectors
		.delete_by_tenant(&payload.tenant_id)
		.await
		.map_err(|err| ServiceError::VectorStore { message: err.to_string() })?;
	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct StoreStatsBody {
	total_vectors: u64,
	dimension: u32,
	vector_store_healthy: bool,
	embedding_healthy: bool,
}

async fn store_stats(State(state): State<AppState>) -> Result<Json<StoreStatsBody>, ApiError> {
	let vector_store_healthy = state.service.vectors.healthy().await;
	let embedding_healthy = state
		.service
		.providers
		.embedding
		.healthy(&state.service.cfg.providers.embedding)
		.await;
	let stats = state
		.service
		.vectors
		.stats()
		.await
		.map_err(|err| ServiceError::VectorStore { message: err.to_string() })?;

	Ok(Json(StoreStatsBody {
		total_vectors: stats.total_vectors,
		dimension: stats.dimension,
		vector_store_healthy,
		embedding_healthy,
	}))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let (status, error_code) = match &err {
			ServiceError::InvalidRequest { .. } =>
				(StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
			ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
			ServiceError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
			ServiceError::Provider { .. } => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
			ServiceError::Storage { .. } =>
				(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
			ServiceError::VectorStore { .. } =>
				(StatusCode::INTERNAL_SERVER_ERROR, "VECTOR_STORE_ERROR"),
		};

		Self { status, error_code: error_code.to_string(), message: err.to_string() }
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
