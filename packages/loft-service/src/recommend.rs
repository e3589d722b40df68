use serde::{Deserialize, Serialize};

use loft_domain::{AttributeProfile, ShopperIntent};
use loft_storage::qdrant::{RecordMetadata, ScoredRecord, SearchFilter, SearchParams};

use crate::{LoftService, ServiceError, ServiceResult};

/// Features that satisfy a cooling preference.
const COOLING_FEATURES: [&str; 4] =
	["cooling-gel", "temperature-regulation", "graphite-infused", "copper-infused"];

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecommendOptions {
	pub top_k: Option<u32>,
	pub include_out_of_stock: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecommendedProduct {
	pub product_id: String,
	pub title: String,
	pub vendor: String,
	pub product_type: String,
	pub score: f32,
	pub boosted_score: f32,
	pub firmness: Option<String>,
	pub height: Option<String>,
	pub material: Option<String>,
	pub certifications: Vec<String>,
	pub features: Vec<String>,
	pub support_features: Vec<String>,
	pub why_it_fits: Vec<String>,
	pub fit_score: u32,
	pub price: Option<f64>,
	pub available_for_sale: bool,
	pub image_url: Option<String>,
	pub product_url: Option<String>,
}

impl LoftService {
	/// Embeds the shopper intent, searches the vector store with headroom
	/// for post-filtering, re-scores with deterministic boosts, and explains
	/// each pick.
	pub async fn recommend(
		&self,
		tenant_id: &str,
		intent: &ShopperIntent,
		opts: RecommendOptions,
	) -> ServiceResult<Vec<RecommendedProduct>> {
		let top_k = opts
			.top_k
			.unwrap_or(self.cfg.recommend.default_top_k)
			.min(self.cfg.recommend.max_top_k)
			.max(1);
		let text = intent_text(intent);

		if text.trim().is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "Shopper intent carries no preferences to search with.".to_string(),
			});
		}

		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &[text.clone()])
			.await?;
		let Some(query) = embeddings.into_iter().next() else {
			return Err(ServiceError::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		let expected_dim =
			self.providers.embedding.dimensions(&self.cfg.providers.embedding) as usize;

		if query.len() != expected_dim {
			return Err(ServiceError::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		let params = SearchParams {
			// Double the ask so boosting can reorder before the final cut.
			top_k: (top_k as u64) * 2,
			filter: build_search_filter(tenant_id, intent, opts.include_out_of_stock),
		};
		let candidates = self
			.vectors
			.search(&query, &params)
			.await
			.map_err(|err| ServiceError::VectorStore { message: err.to_string() })?;

		tracing::debug!(
			tenant_id,
			candidates = candidates.len(),
			top_k,
			"Vector search completed for recommendation."
		);

		Ok(rank_candidates(candidates, intent, top_k as usize))
	}
}

/// Composes the embedding text from every present intent field, in a fixed
/// order, " | "-separated.
pub fn intent_text(intent: &ShopperIntent) -> String {
	let mut parts: Vec<String> = Vec::new();

	if let Some(raw_query) = intent.raw_query.as_deref()
		&& !raw_query.trim().is_empty()
	{
		parts.push(raw_query.trim().to_string());
	}
	if let Some(firmness) = intent.firmness {
		parts.push(format!("{} firmness", firmness.as_str()));
	}
	if let Some(position) = intent.sleep_position {
		parts.push(format!("{} sleeper", position.as_str()));
	}
	if let Some(body_type) = intent.body_type {
		parts.push(format!("{} build", body_type.as_str()));
	}
	if let Some(material) = intent.preferred_material {
		parts.push(format!("{} mattress", material.as_str()));
	}
	if intent.cooling_preference {
		parts.push("cooling features temperature regulation".to_string());
	}
	if intent.motion_isolation {
		parts.push("motion isolation partner disturbance".to_string());
	}
	if intent.edge_support {
		parts.push("edge support perimeter reinforcement".to_string());
	}
	if intent.organic {
		parts.push("organic natural materials eco-friendly".to_string());
	}
	if !intent.sleep_issues.is_empty() {
		parts.push(intent.sleep_issues.join(" "));
	}
	if !intent.certifications.is_empty() {
		parts.push(intent.certifications.join(" "));
	}

	parts.join(" | ")
}

pub fn build_search_filter(
	tenant_id: &str,
	intent: &ShopperIntent,
	include_out_of_stock: bool,
) -> SearchFilter {
	SearchFilter {
		tenant_id: tenant_id.to_string(),
		available_only: !include_out_of_stock,
		price_min: intent.budget.as_ref().and_then(|budget| budget.min),
		price_max: intent.budget.as_ref().and_then(|budget| budget.max),
		material: intent.preferred_material.map(|material| material.as_str().to_string()),
	}
}

/// Multiplicative re-scoring over the raw similarity score. Matching more of
/// the stated preferences can only raise a candidate, never sink it.
pub fn boost_multiplier(intent: &ShopperIntent, profile: &AttributeProfile) -> f32 {
	let mut multiplier = 1.0;

	if let Some(firmness) = intent.firmness
		&& profile.firmness == Some(firmness)
	{
		multiplier *= 1.5;
	}
	if intent.cooling_preference
		&& COOLING_FEATURES.iter().any(|feature| profile.features.contains(*feature))
	{
		multiplier *= 1.3;
	}
	if intent.motion_isolation && profile.features.contains("motion-isolation") {
		multiplier *= 1.3;
	}
	if intent.edge_support && profile.features.contains("edge-support") {
		multiplier *= 1.2;
	}
	if intent.organic && profile.features.contains("organic-materials") {
		multiplier *= 1.3;
	}

	let matching_certifications = intent
		.certifications
		.iter()
		.filter(|certification| profile.certifications.contains(*certification))
		.count();

	if matching_certifications > 0 {
		multiplier *= 1.0 + matching_certifications as f32 * 0.1;
	}

	multiplier
}

pub fn rank_candidates(
	candidates: Vec<ScoredRecord>,
	intent: &ShopperIntent,
	top_k: usize,
) -> Vec<RecommendedProduct> {
	let mut boosted: Vec<(f32, ScoredRecord)> = candidates
		.into_iter()
		.map(|candidate| {
			let multiplier = boost_multiplier(intent, &candidate.metadata.profile);

			(candidate.score * multiplier, candidate)
		})
		.collect();

	boosted.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

	boosted
		.into_iter()
		.take(top_k)
		.map(|(boosted_score, candidate)| to_recommendation(candidate, boosted_score, intent))
		.collect()
}

fn to_recommendation(
	candidate: ScoredRecord,
	boosted_score: f32,
	intent: &ShopperIntent,
) -> RecommendedProduct {
	let RecordMetadata {
		product_id,
		title,
		product_type,
		vendor,
		profile,
		price,
		available_for_sale,
		image_url,
		product_url,
		..
	} = candidate.metadata;
	let why_it_fits = build_explanations(intent, &profile);
	let fit_score = fit_score(intent, &profile);

	RecommendedProduct {
		product_id,
		title,
		vendor,
		product_type,
		score: candidate.score,
		boosted_score,
		firmness: profile.firmness.map(|firmness| firmness.as_str().to_string()),
		height: profile.height.clone(),
		material: profile.material.map(|material| material.as_str().to_string()),
		certifications: profile.certifications.iter().cloned().collect(),
		features: profile.features.iter().cloned().collect(),
		support_features: profile.support_features.iter().cloned().collect(),
		why_it_fits,
		fit_score,
		price: price.filter(|price| *price > 0.0),
		available_for_sale,
		image_url,
		product_url,
	}
}

/// Human-readable reasons keyed to which intent fields matched which profile
/// fields, with a generic fallback when nothing specific matched.
pub fn build_explanations(intent: &ShopperIntent, profile: &AttributeProfile) -> Vec<String> {
	let mut explanations = Vec::new();

	if let Some(firmness) = intent.firmness
		&& profile.firmness == Some(firmness)
	{
		explanations
			.push(format!("Matches your preferred {} firmness level", firmness.as_str()));
	}
	if let Some(position) = intent.sleep_position
		&& profile.firmness == Some(position.ideal_firmness())
	{
		explanations.push(format!("Ideal firmness for {} sleepers", position.as_str()));
	}
	if intent.cooling_preference
		&& COOLING_FEATURES.iter().any(|feature| profile.features.contains(*feature))
	{
		explanations.push("Includes cooling technology to keep you comfortable".to_string());
	}
	if intent.motion_isolation && profile.features.contains("motion-isolation") {
		explanations.push("Excellent motion isolation for undisturbed sleep".to_string());
	}
	if intent.edge_support && profile.features.contains("edge-support") {
		explanations
			.push("Strong edge support for sitting and sleeping near the edge".to_string());
	}
	if intent.organic && profile.features.contains("organic-materials") {
		explanations.push("Made with organic and natural materials".to_string());
	}

	let matching_certifications: Vec<&str> = intent
		.certifications
		.iter()
		.filter(|certification| profile.certifications.contains(*certification))
		.map(|certification| certification.as_str())
		.collect();

	if !matching_certifications.is_empty() {
		explanations.push(format!("Certified: {}", matching_certifications.join(", ")));
	}

	for issue in &intent.sleep_issues {
		match issue.as_str() {
			"back-pain" if profile.features.contains("pressure-relief") => {
				explanations
					.push("Pressure relief technology helps with back pain".to_string());
			},
			"hot-sleeper"
				if profile.features.contains("cooling-gel")
					|| profile.features.contains("temperature-regulation") =>
			{
				explanations
					.push("Cooling features help hot sleepers stay comfortable".to_string());
			},
			"partner-disturbance" if profile.features.contains("motion-isolation") => {
				explanations.push("Motion isolation reduces partner disturbance".to_string());
			},
			_ => {},
		}
	}

	if explanations.is_empty() {
		explanations.push("Highly rated match based on your preferences".to_string());
	}

	explanations
}

/// 0-100 score: a base of 60 plus fixed points per satisfied criterion.
pub fn fit_score(intent: &ShopperIntent, profile: &AttributeProfile) -> u32 {
	let mut score = 60_u32;

	if let Some(firmness) = intent.firmness
		&& profile.firmness == Some(firmness)
	{
		score += 10;
	}
	if let Some(material) = intent.preferred_material
		&& profile.material == Some(material)
	{
		score += 8;
	}
	if intent.cooling_preference
		&& COOLING_FEATURES.iter().any(|feature| profile.features.contains(*feature))
	{
		score += 7;
	}
	if intent.motion_isolation && profile.features.contains("motion-isolation") {
		score += 5;
	}
	if intent.edge_support && profile.features.contains("edge-support") {
		score += 5;
	}
	if intent.organic && profile.features.contains("organic-materials") {
		score += 5;
	}

	score.min(100)
}

#[cfg(test)]
mod tests {
	use super::*;
	use loft_domain::{Firmness, Material, SleepPosition};

	fn intent() -> ShopperIntent {
		ShopperIntent {
			firmness: Some(Firmness::MediumFirm),
			preferred_material: Some(Material::Hybrid),
			cooling_preference: true,
			motion_isolation: true,
			edge_support: true,
			organic: false,
			certifications: vec!["CertiPUR-US".to_string()],
			..Default::default()
		}
	}

	fn full_match_profile() -> AttributeProfile {
		let mut profile = AttributeProfile::default();

		profile.firmness = Some(Firmness::MediumFirm);
		profile.material = Some(Material::Hybrid);
		profile.features.insert("cooling-gel".to_string());
		profile.features.insert("motion-isolation".to_string());
		profile.features.insert("edge-support".to_string());
		profile.certifications.insert("CertiPUR-US".to_string());

		profile
	}

	#[test]
	fn intent_text_uses_fixed_field_order() {
		let mut intent = intent();

		intent.raw_query = Some("best mattress for couples".to_string());
		intent.sleep_position = Some(SleepPosition::Side);

		let text = intent_text(&intent);

		assert_eq!(
			text,
			"best mattress for couples | medium-firm firmness | side sleeper | hybrid mattress \
			 | cooling features temperature regulation | motion isolation partner disturbance | \
			 edge support perimeter reinforcement | CertiPUR-US"
		);
	}

	#[test]
	fn empty_intent_produces_empty_text() {
		assert!(intent_text(&ShopperIntent::default()).is_empty());
	}

	#[test]
	fn boosts_compound_multiplicatively() {
		let multiplier = boost_multiplier(&intent(), &full_match_profile());
		// 1.5 * 1.3 * 1.3 * 1.2 * 1.1
		let expected = 1.5 * 1.3 * 1.3 * 1.2 * 1.1;

		assert!((multiplier - expected).abs() < 1e-6);
	}

	#[test]
	fn matching_more_preferences_never_scores_lower() {
		let intent = intent();
		let full = boost_multiplier(&intent, &full_match_profile());
		let mut partial_profile = full_match_profile();

		partial_profile.features.remove("motion-isolation");

		let partial = boost_multiplier(&intent, &partial_profile);

		assert!(full >= partial);
		assert!(partial >= 1.0);
	}

	#[test]
	fn fit_score_caps_at_one_hundred() {
		assert_eq!(fit_score(&intent(), &full_match_profile()), 60 + 10 + 8 + 7 + 5 + 5);
		assert_eq!(fit_score(&ShopperIntent::default(), &AttributeProfile::default()), 60);
	}

	#[test]
	fn explanations_fall_back_to_generic_sentence() {
		let explanations = build_explanations(&ShopperIntent::default(), &AttributeProfile::default());

		assert_eq!(explanations, vec!["Highly rated match based on your preferences".to_string()]);
	}

	#[test]
	fn sleep_issue_explanations_key_to_profile_features() {
		let mut intent = ShopperIntent::default();

		intent.sleep_issues = vec!["back-pain".to_string(), "partner-disturbance".to_string()];

		let mut profile = AttributeProfile::default();

		profile.features.insert("pressure-relief".to_string());

		let explanations = build_explanations(&intent, &profile);

		assert!(explanations.iter().any(|line| line.contains("back pain")));
		assert!(!explanations.iter().any(|line| line.contains("partner disturbance")));
	}

	#[test]
	fn ranking_sorts_by_boosted_score_and_truncates() {
		use loft_storage::qdrant::RecordMetadata;
		use time::OffsetDateTime;

		let metadata = |profile: AttributeProfile| RecordMetadata {
			tenant_id: "acme.example".to_string(),
			product_id: "p".to_string(),
			title: "t".to_string(),
			product_type: "Mattress".to_string(),
			vendor: "v".to_string(),
			profile,
			price: Some(500.0),
			available_for_sale: true,
			image_url: None,
			product_url: None,
			updated_at: OffsetDateTime::UNIX_EPOCH,
		};
		let candidates = vec![
			ScoredRecord {
				point_id: "a".to_string(),
				score: 0.9,
				metadata: metadata(AttributeProfile::default()),
			},
			ScoredRecord {
				point_id: "b".to_string(),
				score: 0.7,
				metadata: metadata(full_match_profile()),
			},
		];
		let ranked = rank_candidates(candidates, &intent(), 1);

		// The boosted full match overtakes the higher raw similarity.
		assert_eq!(ranked.len(), 1);
		assert!(ranked[0].boosted_score > 0.9);
		assert_eq!(ranked[0].fit_score, 95);
	}
}
