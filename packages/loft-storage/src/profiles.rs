use serde_json::Value;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use loft_domain::AttributeProfile;

use crate::{
	Result,
	models::{ProductProfileRecord, method_str, set_to_json},
};

pub struct StoreProfileArgs<'a> {
	pub tenant_id: &'a str,
	pub product_id: &'a str,
	pub title: &'a str,
	pub body: &'a str,
	pub vendor: &'a str,
	pub product_type: &'a str,
	pub tags: &'a [String],
	pub content_hash: &'a str,
	pub profile: &'a AttributeProfile,
	pub price: Option<f64>,
	pub available_for_sale: bool,
	pub image_url: Option<&'a str>,
	pub product_url: Option<&'a str>,
	pub now: OffsetDateTime,
}

/// Inserts or refreshes the cached profile for one tenant+content-hash.
pub async fn upsert_profile(
	pool: &PgPool,
	args: StoreProfileArgs<'_>,
) -> Result<ProductProfileRecord> {
	let StoreProfileArgs {
		tenant_id,
		product_id,
		title,
		body,
		vendor,
		product_type,
		tags,
		content_hash,
		profile,
		price,
		available_for_sale,
		image_url,
		product_url,
		now,
	} = args;
	let tags_json = Value::Array(tags.iter().cloned().map(Value::from).collect());
	let evidence_json = serde_json::to_value(&profile.source_evidence)?;
	let record = sqlx::query_as::<_, ProductProfileRecord>(
		"\
INSERT INTO product_profiles (
	profile_id,
	tenant_id,
	product_id,
	title,
	body,
	vendor,
	product_type,
	tags,
	content_hash,
	firmness,
	height,
	material,
	certifications,
	features,
	support_features,
	enrichment_method,
	confidence,
	source_evidence,
	model_version,
	locked_firmness,
	locked_height,
	locked_material,
	locked_certifications,
	locked_features,
	locked_support_features,
	price,
	available_for_sale,
	image_url,
	product_url,
	enriched_at,
	created_at,
	updated_at
)
VALUES (
	$1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19,
	$20,$21,$22,$23,$24,$25,$26,$27,$28,$29,$30,$31,$32
)
ON CONFLICT (tenant_id, content_hash) DO UPDATE
SET
	product_id = EXCLUDED.product_id,
	title = EXCLUDED.title,
	body = EXCLUDED.body,
	vendor = EXCLUDED.vendor,
	product_type = EXCLUDED.product_type,
	tags = EXCLUDED.tags,
	firmness = EXCLUDED.firmness,
	height = EXCLUDED.height,
	material = EXCLUDED.material,
	certifications = EXCLUDED.certifications,
	features = EXCLUDED.features,
	support_features = EXCLUDED.support_features,
	enrichment_method = EXCLUDED.enrichment_method,
	confidence = EXCLUDED.confidence,
	source_evidence = EXCLUDED.source_evidence,
	model_version = EXCLUDED.model_version,
	locked_firmness = EXCLUDED.locked_firmness,
	locked_height = EXCLUDED.locked_height,
	locked_material = EXCLUDED.locked_material,
	locked_certifications = EXCLUDED.locked_certifications,
	locked_features = EXCLUDED.locked_features,
	locked_support_features = EXCLUDED.locked_support_features,
	price = EXCLUDED.price,
	available_for_sale = EXCLUDED.available_for_sale,
	image_url = EXCLUDED.image_url,
	product_url = EXCLUDED.product_url,
	enriched_at = EXCLUDED.enriched_at,
	updated_at = EXCLUDED.updated_at
RETURNING *",
	)
	.bind(Uuid::new_v4())
	.bind(tenant_id)
	.bind(product_id)
	.bind(title)
	.bind(body)
	.bind(vendor)
	.bind(product_type)
	.bind(tags_json)
	.bind(content_hash)
	.bind(profile.firmness.map(|firmness| firmness.as_str()))
	.bind(profile.height.as_deref())
	.bind(profile.material.map(|material| material.as_str()))
	.bind(set_to_json(&profile.certifications))
	.bind(set_to_json(&profile.features))
	.bind(set_to_json(&profile.support_features))
	.bind(method_str(profile.enrichment_method))
	.bind(profile.confidence)
	.bind(evidence_json)
	.bind(profile.model_version.as_deref())
	.bind(profile.locks.firmness)
	.bind(profile.locks.height)
	.bind(profile.locks.material)
	.bind(profile.locks.certifications)
	.bind(profile.locks.features)
	.bind(profile.locks.support_features)
	.bind(price)
	.bind(available_for_sale)
	.bind(image_url)
	.bind(product_url)
	.bind(now)
	.bind(now)
	.bind(now)
	.fetch_one(pool)
	.await?;

	Ok(record)
}

pub async fn fetch_by_content_hash(
	pool: &PgPool,
	tenant_id: &str,
	content_hash: &str,
) -> Result<Option<ProductProfileRecord>> {
	let record = sqlx::query_as::<_, ProductProfileRecord>(
		"SELECT * FROM product_profiles WHERE tenant_id = $1 AND content_hash = $2",
	)
	.bind(tenant_id)
	.bind(content_hash)
	.fetch_optional(pool)
	.await?;

	Ok(record)
}

/// Latest profile for a product, whatever content hash produced it. Used to
/// carry human lock flags across content changes.
pub async fn fetch_by_product(
	pool: &PgPool,
	tenant_id: &str,
	product_id: &str,
) -> Result<Option<ProductProfileRecord>> {
	let record = sqlx::query_as::<_, ProductProfileRecord>(
		"\
SELECT * FROM product_profiles
WHERE tenant_id = $1 AND product_id = $2
ORDER BY updated_at DESC
LIMIT 1",
	)
	.bind(tenant_id)
	.bind(product_id)
	.fetch_optional(pool)
	.await?;

	Ok(record)
}

pub async fn fetch(pool: &PgPool, profile_id: Uuid) -> Result<Option<ProductProfileRecord>> {
	let record = sqlx::query_as::<_, ProductProfileRecord>(
		"SELECT * FROM product_profiles WHERE profile_id = $1",
	)
	.bind(profile_id)
	.fetch_optional(pool)
	.await?;

	Ok(record)
}

pub async fn list(
	pool: &PgPool,
	tenant_id: &str,
	limit: i64,
	offset: i64,
) -> Result<Vec<ProductProfileRecord>> {
	let records = sqlx::query_as::<_, ProductProfileRecord>(
		"\
SELECT * FROM product_profiles
WHERE tenant_id = $1
ORDER BY updated_at DESC
LIMIT $2 OFFSET $3",
	)
	.bind(tenant_id)
	.bind(limit)
	.bind(offset)
	.fetch_all(pool)
	.await?;

	Ok(records)
}

/// Rewrites the attribute columns after a human edit, lock flags included.
pub async fn update_attributes(
	pool: &PgPool,
	profile_id: Uuid,
	profile: &AttributeProfile,
	now: OffsetDateTime,
) -> Result<Option<ProductProfileRecord>> {
	let evidence_json = serde_json::to_value(&profile.source_evidence)?;
	let record = sqlx::query_as::<_, ProductProfileRecord>(
		"\
UPDATE product_profiles
SET
	firmness = $1,
	height = $2,
	material = $3,
	certifications = $4,
	features = $5,
	support_features = $6,
	enrichment_method = $7,
	confidence = $8,
	source_evidence = $9,
	model_version = $10,
	locked_firmness = $11,
	locked_height = $12,
	locked_material = $13,
	locked_certifications = $14,
	locked_features = $15,
	locked_support_features = $16,
	updated_at = $17
WHERE profile_id = $18
RETURNING *",
	)
	.bind(profile.firmness.map(|firmness| firmness.as_str()))
	.bind(profile.height.as_deref())
	.bind(profile.material.map(|material| material.as_str()))
	.bind(set_to_json(&profile.certifications))
	.bind(set_to_json(&profile.features))
	.bind(set_to_json(&profile.support_features))
	.bind(method_str(profile.enrichment_method))
	.bind(profile.confidence)
	.bind(evidence_json)
	.bind(profile.model_version.as_deref())
	.bind(profile.locks.firmness)
	.bind(profile.locks.height)
	.bind(profile.locks.material)
	.bind(profile.locks.certifications)
	.bind(profile.locks.features)
	.bind(profile.locks.support_features)
	.bind(now)
	.bind(profile_id)
	.fetch_optional(pool)
	.await?;

	Ok(record)
}

pub async fn delete(pool: &PgPool, profile_id: Uuid) -> Result<bool> {
	let result = sqlx::query("DELETE FROM product_profiles WHERE profile_id = $1")
		.bind(profile_id)
		.execute(pool)
		.await?;

	Ok(result.rows_affected() > 0)
}
