use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, models::IndexJobRecord};

pub struct NewJobArgs<'a> {
	pub tenant_id: &'a str,
	pub use_ai_enrichment: bool,
	pub use_web_search: bool,
	pub confidence_threshold: f32,
	pub now: OffsetDateTime,
}

/// Creates a pending job. A partial unique index over non-terminal jobs
/// makes the job table the sole coordination point: a second active job for
/// the same tenant surfaces as a conflict here.
pub async fn create_job(pool: &PgPool, args: NewJobArgs<'_>) -> Result<IndexJobRecord> {
	let result = sqlx::query_as::<_, IndexJobRecord>(
		"\
INSERT INTO index_jobs (
	job_id,
	tenant_id,
	status,
	use_ai_enrichment,
	use_web_search,
	confidence_threshold,
	created_at
)
VALUES ($1, $2, 'pending', $3, $4, $5, $6)
RETURNING *",
	)
	.bind(Uuid::new_v4())
	.bind(args.tenant_id)
	.bind(args.use_ai_enrichment)
	.bind(args.use_web_search)
	.bind(args.confidence_threshold)
	.bind(args.now)
	.fetch_one(pool)
	.await;

	match result {
		Ok(record) => Ok(record),
		Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() =>
			Err(Error::Conflict(format!(
				"An indexing job is already active for tenant {}.",
				args.tenant_id
			))),
		Err(err) => Err(err.into()),
	}
}

pub async fn active_job(pool: &PgPool, tenant_id: &str) -> Result<Option<IndexJobRecord>> {
	let record = sqlx::query_as::<_, IndexJobRecord>(
		"\
SELECT * FROM index_jobs
WHERE tenant_id = $1 AND status IN ('pending', 'running')
LIMIT 1",
	)
	.bind(tenant_id)
	.fetch_optional(pool)
	.await?;

	Ok(record)
}

pub async fn latest_job(pool: &PgPool, tenant_id: &str) -> Result<Option<IndexJobRecord>> {
	let record = sqlx::query_as::<_, IndexJobRecord>(
		"\
SELECT * FROM index_jobs
WHERE tenant_id = $1
ORDER BY created_at DESC
LIMIT 1",
	)
	.bind(tenant_id)
	.fetch_optional(pool)
	.await?;

	Ok(record)
}

pub async fn recent_jobs(
	pool: &PgPool,
	tenant_id: &str,
	limit: i64,
) -> Result<Vec<IndexJobRecord>> {
	let records = sqlx::query_as::<_, IndexJobRecord>(
		"\
SELECT * FROM index_jobs
WHERE tenant_id = $1
ORDER BY created_at DESC
LIMIT $2",
	)
	.bind(tenant_id)
	.bind(limit)
	.fetch_all(pool)
	.await?;

	Ok(records)
}

pub async fn fetch_job(pool: &PgPool, job_id: Uuid) -> Result<Option<IndexJobRecord>> {
	let record =
		sqlx::query_as::<_, IndexJobRecord>("SELECT * FROM index_jobs WHERE job_id = $1")
			.bind(job_id)
			.fetch_optional(pool)
			.await?;

	Ok(record)
}

/// Claims the oldest pending job and flips it to running in one
/// transaction. Concurrent workers skip each other's claims.
pub async fn claim_next_job(pool: &PgPool, now: OffsetDateTime) -> Result<Option<IndexJobRecord>> {
	let mut tx = pool.begin().await?;
	let row = sqlx::query_as::<_, IndexJobRecord>(
		"\
SELECT * FROM index_jobs
WHERE status = 'pending'
ORDER BY created_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED",
	)
	.fetch_optional(&mut *tx)
	.await?;
	let job = if let Some(mut job) = row {
		sqlx::query("UPDATE index_jobs SET status = 'running', started_at = $1 WHERE job_id = $2")
			.bind(now)
			.bind(job.job_id)
			.execute(&mut *tx)
			.await?;

		job.status = "running".to_string();
		job.started_at = Some(now);

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn set_total(pool: &PgPool, job_id: Uuid, total: i32) -> Result<()> {
	sqlx::query("UPDATE index_jobs SET total_products = $1 WHERE job_id = $2")
		.bind(total)
		.bind(job_id)
		.execute(pool)
		.await?;

	Ok(())
}

pub async fn update_progress(
	pool: &PgPool,
	job_id: Uuid,
	processed: i32,
	failed: i32,
) -> Result<()> {
	sqlx::query(
		"UPDATE index_jobs SET processed_products = $1, failed_products = $2 WHERE job_id = $3",
	)
	.bind(processed)
	.bind(failed)
	.bind(job_id)
	.execute(pool)
	.await?;

	Ok(())
}

/// Terminal transitions are guarded on the current status so a finished job
/// can never be revived or re-finished.
pub async fn complete_job(
	pool: &PgPool,
	job_id: Uuid,
	no_matches: bool,
	now: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE index_jobs
SET status = 'completed', no_matches = $1, finished_at = $2
WHERE job_id = $3 AND status = 'running'",
	)
	.bind(no_matches)
	.bind(now)
	.bind(job_id)
	.execute(pool)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn fail_job(
	pool: &PgPool,
	job_id: Uuid,
	message: &str,
	now: OffsetDateTime,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE index_jobs
SET status = 'failed', error_message = $1, finished_at = $2
WHERE job_id = $3 AND status IN ('pending', 'running')",
	)
	.bind(message)
	.bind(now)
	.bind(job_id)
	.execute(pool)
	.await?;

	Ok(result.rows_affected() > 0)
}
