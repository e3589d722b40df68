use time::OffsetDateTime;

use loft_domain::{
	AttributeProfile, CatalogItem, DeterministicMapper, HeuristicExtractor, gate,
};
use loft_storage::{
	models::ProductProfileRecord,
	profiles::{self, StoreProfileArgs},
};

use crate::{LoftService, ServiceResult};

#[derive(Clone, Copy, Debug)]
pub struct EnrichmentOptions {
	pub use_ai_enrichment: bool,
	pub use_web_search: bool,
	pub confidence_threshold: f32,
	pub skip_cache: bool,
}
impl EnrichmentOptions {
	pub fn from_config(cfg: &loft_config::Enrichment) -> Self {
		Self {
			use_ai_enrichment: cfg.use_ai_enrichment,
			use_web_search: cfg.use_web_search,
			confidence_threshold: cfg.confidence_threshold,
			skip_cache: false,
		}
	}
}

#[derive(Debug)]
pub struct EnrichmentOutcome {
	pub record: ProductProfileRecord,
	pub profile: AttributeProfile,
	pub from_cache: bool,
}

impl LoftService {
	/// Runs the full enrichment ladder for one catalog item: content-hash
	/// cache, deterministic mapping, heuristic rules, then — gated — web
	/// search and LLM extraction, merged in strict precedence order and
	/// persisted. Prior human locks survive re-enrichment.
	pub async fn enrich_item(
		&self,
		tenant_id: &str,
		item: &CatalogItem,
		opts: EnrichmentOptions,
	) -> ServiceResult<EnrichmentOutcome> {
		let content_hash = item.content_hash();

		if !opts.skip_cache
			&& let Some(record) =
				profiles::fetch_by_content_hash(&self.db.pool, tenant_id, &content_hash).await?
		{
			let profile = record.attribute_profile();

			return Ok(EnrichmentOutcome { record, profile, from_cache: true });
		}

		let prior = profiles::fetch_by_product(&self.db.pool, tenant_id, &item.id).await?;
		let seed = prior
			.as_ref()
			.map(|record| locked_seed(&record.attribute_profile()))
			.unwrap_or_default();

		let mapper = self
			.cfg
			.enrichment
			.mapping_overrides
			.get(tenant_id)
			.map(DeterministicMapper::with_overrides)
			.unwrap_or_default();
		let deterministic = mapper.extract(item);
		let heuristic = HeuristicExtractor::default().extract(&item.combined_text());
		let local_confidence = deterministic.confidence.max(heuristic.confidence);

		let websearch = if opts.use_web_search && gate::is_weak_data(item, local_confidence) {
			match self.providers.websearch.extract(&self.cfg.providers.websearch, item).await {
				Ok(profile) => profile,
				Err(err) => {
					tracing::warn!(
						product_id = %item.id,
						error = %err,
						"Web search enrichment failed. Continuing without it."
					);

					AttributeProfile::default()
				},
			}
		} else {
			AttributeProfile::default()
		};

		let confidence_so_far = local_confidence.max(websearch.confidence);
		let llm = if opts.use_ai_enrichment && confidence_so_far < opts.confidence_threshold {
			match self.providers.enrichment.extract(&self.cfg.providers.enrichment, item).await {
				Ok(profile) => profile,
				Err(err) => {
					tracing::warn!(
						product_id = %item.id,
						error = %err,
						"LLM enrichment failed. Continuing without it."
					);

					AttributeProfile::default()
				},
			}
		} else {
			AttributeProfile::default()
		};

		let profile = merge_partials(seed, [deterministic, websearch, heuristic, llm]);
		let now = OffsetDateTime::now_utc();
		let record = profiles::upsert_profile(
			&self.db.pool,
			StoreProfileArgs {
				tenant_id,
				product_id: &item.id,
				title: &item.title,
				body: &item.description,
				vendor: &item.vendor,
				product_type: &item.product_type,
				tags: &item.tags,
				content_hash: &content_hash,
				profile: &profile,
				price: item.price,
				available_for_sale: item.available_for_sale,
				image_url: item.image_url.as_deref(),
				product_url: item.product_url.as_deref(),
				now,
			},
		)
		.await?;

		Ok(EnrichmentOutcome { record, profile, from_cache: false })
	}
}

/// Applies partial profiles in decreasing priority order; zero-confidence
/// partials contribute nothing.
pub fn merge_partials(
	seed: AttributeProfile,
	ordered: [AttributeProfile; 4],
) -> AttributeProfile {
	let mut merged = seed;

	for partial in ordered {
		if partial.confidence > 0.0 {
			merged.apply(partial);
		}
	}

	merged
}

/// A seed profile carrying only human-locked values and their lock flags,
/// so re-enrichment can never overwrite an operator override.
fn locked_seed(prior: &AttributeProfile) -> AttributeProfile {
	let mut seed = AttributeProfile::default();

	seed.locks = prior.locks;

	if prior.locks.firmness {
		seed.firmness = prior.firmness;
	}
	if prior.locks.height {
		seed.height = prior.height.clone();
	}
	if prior.locks.material {
		seed.material = prior.material;
	}
	if prior.locks.certifications {
		seed.certifications = prior.certifications.clone();
	}
	if prior.locks.features {
		seed.features = prior.features.clone();
	}
	if prior.locks.support_features {
		seed.support_features = prior.support_features.clone();
	}

	seed
}

#[cfg(test)]
mod tests {
	use super::*;
	use loft_domain::{EnrichmentMethod, Firmness};

	fn partial(
		firmness: Option<Firmness>,
		confidence: f32,
		method: EnrichmentMethod,
	) -> AttributeProfile {
		AttributeProfile { firmness, confidence, enrichment_method: method, ..Default::default() }
	}

	#[test]
	fn precedence_quartet_resolves_to_deterministic() {
		let merged = merge_partials(
			AttributeProfile::default(),
			[
				partial(Some(Firmness::Firm), 1.0, EnrichmentMethod::Mapping),
				partial(Some(Firmness::Medium), 0.9, EnrichmentMethod::Llm),
				partial(Some(Firmness::Soft), 0.8, EnrichmentMethod::Heuristic),
				partial(Some(Firmness::MediumSoft), 0.4, EnrichmentMethod::Llm),
			],
		);

		assert_eq!(merged.firmness, Some(Firmness::Firm));
		assert_eq!(merged.confidence, 1.0);
	}

	#[test]
	fn zero_confidence_partials_are_ignored() {
		let mut empty = AttributeProfile::default();

		empty.firmness = Some(Firmness::Soft);

		let merged = merge_partials(
			AttributeProfile::default(),
			[
				empty,
				partial(Some(Firmness::Firm), 0.8, EnrichmentMethod::Heuristic),
				AttributeProfile::default(),
				AttributeProfile::default(),
			],
		);

		assert_eq!(merged.firmness, Some(Firmness::Firm));
	}

	#[test]
	fn locked_seed_survives_the_whole_ladder() {
		let mut prior = AttributeProfile::default();

		prior.firmness = Some(Firmness::Soft);
		prior.locks.firmness = true;

		let merged = merge_partials(
			locked_seed(&prior),
			[
				partial(Some(Firmness::Firm), 1.0, EnrichmentMethod::Mapping),
				AttributeProfile::default(),
				partial(Some(Firmness::Medium), 0.8, EnrichmentMethod::Heuristic),
				AttributeProfile::default(),
			],
		);

		assert_eq!(merged.firmness, Some(Firmness::Soft));
		assert!(merged.locks.firmness);
	}

	#[test]
	fn unlocked_prior_values_do_not_seed() {
		let mut prior = AttributeProfile::default();

		prior.firmness = Some(Firmness::Soft);
		prior.height = Some("12 inches".to_string());
		prior.locks.height = true;

		let seed = locked_seed(&prior);

		assert_eq!(seed.firmness, None);
		assert_eq!(seed.height.as_deref(), Some("12 inches"));
	}
}
