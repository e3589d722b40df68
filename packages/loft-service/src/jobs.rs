use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use loft_storage::{jobs, models::IndexJobRecord};

use crate::{LoftService, ServiceError, ServiceResult};

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StartJobRequest {
	pub use_ai_enrichment: Option<bool>,
	pub use_web_search: Option<bool>,
	pub confidence_threshold: Option<f32>,
}

#[derive(Clone, Debug, Serialize)]
pub struct JobView {
	pub job_id: uuid::Uuid,
	pub tenant_id: String,
	pub status: String,
	pub total_products: i32,
	pub processed_products: i32,
	pub failed_products: i32,
	pub no_matches: bool,
	pub percent_complete: f32,
	pub stale: bool,
	pub error_message: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub started_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub finished_at: Option<OffsetDateTime>,
}

impl LoftService {
	/// Enqueues an indexing job for the worker to claim. At most one
	/// non-terminal job per tenant; a second start is a conflict.
	pub async fn start_indexing(
		&self,
		tenant_id: &str,
		request: StartJobRequest,
	) -> ServiceResult<JobView> {
		if tenant_id.trim().is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "tenant_id must be non-empty.".to_string(),
			});
		}
		if let Some(threshold) = request.confidence_threshold
			&& !(0.0..=1.0).contains(&threshold)
		{
			return Err(ServiceError::InvalidRequest {
				message: "confidence_threshold must be in the range 0.0-1.0.".to_string(),
			});
		}

		let now = OffsetDateTime::now_utc();
		let record = jobs::create_job(
			&self.db.pool,
			jobs::NewJobArgs {
				tenant_id,
				use_ai_enrichment: request
					.use_ai_enrichment
					.unwrap_or(self.cfg.enrichment.use_ai_enrichment),
				use_web_search: request
					.use_web_search
					.unwrap_or(self.cfg.enrichment.use_web_search),
				confidence_threshold: request
					.confidence_threshold
					.unwrap_or(self.cfg.enrichment.confidence_threshold),
				now,
			},
		)
		.await?;

		tracing::info!(tenant_id, job_id = %record.job_id, "Indexing job enqueued.");

		Ok(self.job_view(record, now))
	}

	/// Cooperative stop: the active job is marked failed, and the worker
	/// notices between batches. Nothing is preempted mid-batch.
	pub async fn stop_indexing(&self, tenant_id: &str) -> ServiceResult<JobView> {
		let Some(record) = jobs::active_job(&self.db.pool, tenant_id).await? else {
			return Err(ServiceError::NotFound {
				message: format!("No active indexing job for tenant {tenant_id}."),
			});
		};
		let now = OffsetDateTime::now_utc();

		jobs::fail_job(&self.db.pool, record.job_id, "Stopped by operator.", now).await?;

		let record = jobs::fetch_job(&self.db.pool, record.job_id).await?.ok_or_else(|| {
			ServiceError::NotFound { message: "Job vanished while stopping.".to_string() }
		})?;

		tracing::info!(tenant_id, job_id = %record.job_id, "Indexing job stopped.");

		Ok(self.job_view(record, now))
	}

	pub async fn indexing_status(&self, tenant_id: &str) -> ServiceResult<Option<JobView>> {
		let now = OffsetDateTime::now_utc();
		let record = jobs::latest_job(&self.db.pool, tenant_id).await?;

		Ok(record.map(|record| self.job_view(record, now)))
	}

	pub async fn recent_jobs(&self, tenant_id: &str, limit: i64) -> ServiceResult<Vec<JobView>> {
		let now = OffsetDateTime::now_utc();
		let records = jobs::recent_jobs(&self.db.pool, tenant_id, limit).await?;

		Ok(records.into_iter().map(|record| self.job_view(record, now)).collect())
	}

	pub async fn set_credentials(
		&self,
		tenant_id: &str,
		api_base: &str,
		access_token: &str,
	) -> ServiceResult<()> {
		if api_base.trim().is_empty() || access_token.trim().is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "api_base and access_token must be non-empty.".to_string(),
			});
		}

		loft_storage::credentials::upsert_credentials(
			&self.db.pool,
			tenant_id,
			api_base,
			access_token,
			OffsetDateTime::now_utc(),
		)
		.await?;

		Ok(())
	}

	fn job_view(&self, record: IndexJobRecord, now: OffsetDateTime) -> JobView {
		let stale = record.is_stale(now, self.cfg.indexing.stale_job_minutes);
		let percent_complete = record.percent_complete();

		JobView {
			job_id: record.job_id,
			tenant_id: record.tenant_id,
			status: record.status,
			total_products: record.total_products,
			processed_products: record.processed_products,
			failed_products: record.failed_products,
			no_matches: record.no_matches,
			percent_complete,
			stale,
			error_message: record.error_message,
			created_at: record.created_at,
			started_at: record.started_at,
			finished_at: record.finished_at,
		}
	}
}
