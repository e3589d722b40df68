use std::time::Duration;

use time::OffsetDateTime;
use tokio::time as tokio_time;

use loft_domain::{Bucket, CatalogItem, IndexError, classify};
use loft_providers::{
	catalog::{CatalogAccess, ExportState},
	retry,
};
use loft_service::{EnrichmentOptions, LoftService};
use loft_storage::{
	credentials, jobs,
	models::IndexJobRecord,
	qdrant::{RecordMetadata, VectorRecord, point_id_for},
};

#[derive(Clone, Copy, Debug, Default)]
pub struct JobSummary {
	pub total: usize,
	pub processed: usize,
	pub failed: usize,
	pub no_matches: bool,
	pub stopped: bool,
}

struct BatchOutcome {
	processed: usize,
	failed: usize,
}

/// Drives one claimed job end to end: credentials, bulk export,
/// classification, then batched enrichment + embedding + upsert. Only a
/// critical failure aborts; batch and product failures feed the counters
/// and the job keeps going.
pub async fn run_index_job(
	service: &LoftService,
	job: &IndexJobRecord,
) -> Result<JobSummary, IndexError> {
	let tenant_id = job.tenant_id.as_str();
	let access = resolve_access(service, tenant_id).await?;
	let items = fetch_catalog(service, &access).await?;

	tracing::info!(tenant_id, items = items.len(), "Bulk export downloaded and parsed.");

	let matched = classify_items(service, items).await;

	jobs::set_total(&service.db.pool, job.job_id, matched.len() as i32)
		.await
		.map_err(|err| IndexError::unclassified(err.to_string()))?;

	if matched.is_empty() {
		tracing::info!(tenant_id, "No catalog items matched the domain.");

		return Ok(JobSummary { no_matches: true, ..Default::default() });
	}

	let opts = EnrichmentOptions {
		use_ai_enrichment: job.use_ai_enrichment,
		use_web_search: job.use_web_search,
		confidence_threshold: job.confidence_threshold,
		skip_cache: false,
	};
	let batch_size = service.cfg.indexing.product_batch_size.max(1) as usize;
	let mut summary = JobSummary { total: matched.len(), ..Default::default() };

	for (batch_index, batch) in matched.chunks(batch_size).enumerate() {
		if batch_index > 0 {
			tokio_time::sleep(Duration::from_millis(service.cfg.indexing.batch_delay_ms)).await;
		}
		if !job_still_running(service, job).await {
			tracing::info!(tenant_id, job_id = %job.job_id, "Job no longer running. Stopping.");

			summary.stopped = true;

			return Ok(summary);
		}

		match process_batch(service, tenant_id, batch, opts).await {
			Ok(outcome) => {
				summary.processed += outcome.processed;
				summary.failed += outcome.failed;
			},
			Err(err) if err.should_continue() => {
				tracing::error!(tenant_id, batch_index, error = %err, "Batch abandoned.");

				summary.failed += batch.len();
			},
			Err(err) => return Err(err),
		}

		jobs::update_progress(
			&service.db.pool,
			job.job_id,
			summary.processed as i32,
			summary.failed as i32,
		)
		.await
		.map_err(|err| IndexError::unclassified(err.to_string()))?;
	}

	Ok(summary)
}

async fn resolve_access(
	service: &LoftService,
	tenant_id: &str,
) -> Result<CatalogAccess, IndexError> {
	let record = credentials::fetch_credentials(&service.db.pool, tenant_id)
		.await
		.map_err(|err| IndexError::critical(err.to_string()))?
		.ok_or_else(|| {
			IndexError::critical(format!("No catalog credentials stored for tenant {tenant_id}."))
		})?;

	Ok(CatalogAccess { api_base: record.api_base, access_token: record.access_token })
}

/// Requests the bulk export and polls it to completion, then downloads and
/// parses the record stream. Export rejection, upstream failure, and
/// timeout are all critical.
async fn fetch_catalog(
	service: &LoftService,
	access: &CatalogAccess,
) -> Result<Vec<CatalogItem>, IndexError> {
	let catalog_cfg = &service.cfg.catalog;
	let operation_id = retry::retry_with_backoff(&service.cfg.retry, "bulk export start", || {
		service.providers.catalog.start_bulk_export(catalog_cfg, access)
	})
	.await
	.map_err(|err| IndexError::critical(format!("Bulk export request failed: {err}.")))?;

	tracing::info!(%operation_id, "Bulk export requested.");

	for _ in 0..catalog_cfg.max_poll_attempts {
		let status = retry::retry_with_backoff(&service.cfg.retry, "bulk export poll", || {
			service.providers.catalog.poll_bulk_export(catalog_cfg, access, &operation_id)
		})
		.await
		.map_err(|err| IndexError::critical(format!("Bulk export polling failed: {err}.")))?;

		match status.state {
			ExportState::Completed => {
				tracing::info!(
					object_count = status.object_count,
					"Bulk export completed upstream."
				);

				let Some(url) = status.download_url else {
					// Completed with nothing to download means an empty catalog.
					return Ok(Vec::new());
				};
				let body =
					retry::retry_with_backoff(&service.cfg.retry, "bulk export download", || {
						service.providers.catalog.download_export(catalog_cfg, &url)
					})
					.await
					.map_err(|err| {
						IndexError::critical(format!("Bulk export download failed: {err}."))
					})?;

				return Ok(loft_providers::catalog::parse_export_body(&body));
			},
			ExportState::Failed =>
				return Err(IndexError::critical("Bulk export failed upstream.")),
			ExportState::Running => {
				tokio_time::sleep(Duration::from_millis(catalog_cfg.poll_interval_ms)).await;
			},
		}
	}

	Err(IndexError::critical(format!(
		"Bulk export timed out after {} poll attempts.",
		catalog_cfg.max_poll_attempts
	)))
}

/// Two-stage domain classification. Stage 1 settles definite matches and
/// non-matches by keyword; Stage 2 sends the uncertain bucket to the
/// classifier in fixed batches. A failed or misaligned classifier batch is
/// excluded wholesale, and an oversized uncertain bucket falls back to
/// keywords only.
async fn classify_items(service: &LoftService, items: Vec<CatalogItem>) -> Vec<CatalogItem> {
	let (mut matched, uncertain) = stage1_partition(items);

	tracing::info!(
		matched = matched.len(),
		uncertain = uncertain.len(),
		"Keyword classification complete."
	);

	if uncertain.is_empty() {
		return matched;
	}

	if uncertain.len() > service.cfg.indexing.max_uncertain_products as usize {
		tracing::warn!(
			uncertain = uncertain.len(),
			cap = service.cfg.indexing.max_uncertain_products,
			"Uncertain bucket exceeds the classification cap. Applying keyword-only fallback."
		);
		matched.extend(uncertain.into_iter().filter(classify::conservative_fallback));

		return matched;
	}

	let batch_size = service.cfg.indexing.classification_batch_size.max(1) as usize;

	for (batch_index, batch) in uncertain.chunks(batch_size).enumerate() {
		if batch_index > 0 {
			tokio_time::sleep(Duration::from_millis(
				service.cfg.indexing.classification_delay_ms,
			))
			.await;
		}

		match service
			.providers
			.classifier
			.classify(&service.cfg.providers.classifier, batch)
			.await
		{
			Ok(verdicts) => {
				matched.extend(apply_verdicts(batch.to_vec(), &verdicts));
			},
			Err(err) => {
				// Fail closed: without trustworthy verdicts the whole batch
				// stays out of the matched set.
				tracing::warn!(
					batch_index,
					error = %err,
					"Classifier batch discarded."
				);
			},
		}
	}

	matched
}

fn stage1_partition(items: Vec<CatalogItem>) -> (Vec<CatalogItem>, Vec<CatalogItem>) {
	let mut matched = Vec::new();
	let mut uncertain = Vec::new();

	for item in items {
		match classify::bucket(&item) {
			Bucket::Match => matched.push(item),
			Bucket::Uncertain => uncertain.push(item),
			Bucket::NonMatch => {},
		}
	}

	(matched, uncertain)
}

fn apply_verdicts(batch: Vec<CatalogItem>, verdicts: &[bool]) -> Vec<CatalogItem> {
	if batch.len() != verdicts.len() {
		return Vec::new();
	}

	batch
		.into_iter()
		.zip(verdicts.iter())
		.filter(|(_, verdict)| **verdict)
		.map(|(item, _)| item)
		.collect()
}

/// Enriches a batch item by item, then embeds and upserts the whole batch.
/// A single item failing costs only that item; an embedding or upsert
/// failure costs the batch.
async fn process_batch(
	service: &LoftService,
	tenant_id: &str,
	batch: &[CatalogItem],
	opts: EnrichmentOptions,
) -> Result<BatchOutcome, IndexError> {
	let mut failed = 0_usize;
	let mut enriched = Vec::with_capacity(batch.len());

	for item in batch {
		match service.enrich_item(tenant_id, item, opts).await {
			Ok(outcome) => enriched.push((item, outcome)),
			Err(err) => {
				let err = IndexError::product(format!("Enrichment failed: {err}."));

				tracing::warn!(product_id = %item.id, error = %err, "Item skipped.");

				failed += 1;
			},
		}
	}

	if enriched.is_empty() {
		return Ok(BatchOutcome { processed: 0, failed });
	}

	let texts: Vec<String> = enriched
		.iter()
		.map(|(item, outcome)| {
			outcome.profile.embedding_text(
				&item.title,
				&item.description,
				&item.vendor,
				&item.product_type,
			)
		})
		.collect();
	let embedding_cfg = &service.cfg.providers.embedding;
	let vectors = retry::retry_with_backoff(&service.cfg.retry, "batch embedding", || {
		service.providers.embedding.embed(embedding_cfg, &texts)
	})
	.await
	.map_err(|err| IndexError::batch(format!("Batch embedding failed: {err}.")))?;

	if vectors.len() != enriched.len() {
		return Err(IndexError::batch(format!(
			"Embedding provider returned {} vectors for {} items.",
			vectors.len(),
			enriched.len()
		)));
	}

	let expected_dim = service.cfg.storage.qdrant.vector_dim as usize;
	let now = OffsetDateTime::now_utc();
	let mut records = Vec::with_capacity(enriched.len());

	for ((item, outcome), vector) in enriched.iter().zip(vectors) {
		if vector.len() != expected_dim {
			return Err(IndexError::batch(format!(
				"Embedding dimension {} does not match configured vector_dim {expected_dim}.",
				vector.len()
			)));
		}

		records.push(VectorRecord {
			point_id: point_id_for(tenant_id, &item.id),
			vector,
			metadata: RecordMetadata {
				tenant_id: tenant_id.to_string(),
				product_id: item.id.clone(),
				title: item.title.clone(),
				product_type: item.product_type.clone(),
				vendor: item.vendor.clone(),
				profile: outcome.profile.clone(),
				price: item.price,
				available_for_sale: item.available_for_sale,
				image_url: item.image_url.clone(),
				product_url: item.product_url.clone(),
				updated_at: now,
			},
		});
	}

	retry::retry_with_backoff(&service.cfg.retry, "batch upsert", || {
		service.vectors.upsert(&records)
	})
	.await
	.map_err(|err| IndexError::batch(format!("Vector upsert failed: {err}.")))?;

	Ok(BatchOutcome { processed: records.len(), failed })
}

async fn job_still_running(service: &LoftService, job: &IndexJobRecord) -> bool {
	match jobs::fetch_job(&service.db.pool, job.job_id).await {
		Ok(Some(current)) => current.status == "running",
		Ok(None) => false,
		Err(err) => {
			tracing::error!(job_id = %job.job_id, error = %err, "Job state check failed.");

			false
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(id: &str, title: &str) -> CatalogItem {
		CatalogItem {
			id: id.to_string(),
			title: title.to_string(),
			..Default::default()
		}
	}

	#[test]
	fn stage1_partitions_into_tagged_buckets() {
		let items = vec![
			item("p1", "Cloud Nine Mattress"),
			item("p2", "Ceramic Mug"),
			item("p3", "Plush Foam Sleeper"),
		];
		let (matched, uncertain) = stage1_partition(items);

		assert_eq!(matched.len(), 1);
		assert_eq!(matched[0].id, "p1");
		assert_eq!(uncertain.len(), 1);
		assert_eq!(uncertain[0].id, "p3");
	}

	#[test]
	fn verdicts_select_in_request_order() {
		let batch = vec![item("p1", "a"), item("p2", "b"), item("p3", "c")];
		let kept = apply_verdicts(batch, &[true, false, true]);

		assert_eq!(kept.len(), 2);
		assert_eq!(kept[0].id, "p1");
		assert_eq!(kept[1].id, "p3");
	}

	#[test]
	fn misaligned_verdicts_keep_nothing() {
		let batch = vec![item("p1", "a"), item("p2", "b")];

		assert!(apply_verdicts(batch, &[true]).is_empty());
	}
}
