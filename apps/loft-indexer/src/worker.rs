use std::time::Duration;

use color_eyre::Result;
use time::OffsetDateTime;
use tokio::time as tokio_time;

use loft_service::LoftService;
use loft_storage::jobs;

use crate::indexer;

/// Claims pending jobs one at a time and runs them to a terminal state.
/// The claim query plus the one-active-job-per-tenant index make the job
/// table the sole coordination point across workers.
pub async fn run_worker(service: &LoftService) -> Result<()> {
	let poll_interval =
		Duration::from_millis(service.cfg.indexing.worker_poll_interval_ms);

	loop {
		if let Err(err) = run_once(service).await {
			tracing::error!(error = %err, "Worker iteration failed.");
		}

		tokio_time::sleep(poll_interval).await;
	}
}

pub async fn run_once(service: &LoftService) -> Result<()> {
	let now = OffsetDateTime::now_utc();
	let Some(job) = jobs::claim_next_job(&service.db.pool, now).await? else {
		return Ok(());
	};

	tracing::info!(job_id = %job.job_id, tenant_id = %job.tenant_id, "Indexing job claimed.");

	match indexer::run_index_job(service, &job).await {
		Ok(summary) if summary.stopped => {
			tracing::info!(
				job_id = %job.job_id,
				processed = summary.processed,
				failed = summary.failed,
				"Indexing job stopped cooperatively."
			);
		},
		Ok(summary) => {
			let finished = OffsetDateTime::now_utc();

			jobs::complete_job(&service.db.pool, job.job_id, summary.no_matches, finished)
				.await?;
			tracing::info!(
				job_id = %job.job_id,
				total = summary.total,
				processed = summary.processed,
				failed = summary.failed,
				no_matches = summary.no_matches,
				"Indexing job completed."
			);
		},
		Err(err) => {
			let finished = OffsetDateTime::now_utc();

			jobs::fail_job(&service.db.pool, job.job_id, &err.message, finished).await?;
			tracing::error!(
				job_id = %job.job_id,
				severity = err.severity.as_str(),
				error = %err.message,
				"Indexing job failed."
			);
		},
	}

	Ok(())
}
