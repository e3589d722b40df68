use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter, PointId,
		PointStruct, Query, QueryPointsBuilder, Range, UpsertPointsBuilder, Value,
		VectorParamsBuilder, value::Kind,
	},
};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use loft_domain::AttributeProfile;

use crate::Result;

/// Everything stored alongside a vector. The enriched profile travels as a
/// JSON string in the payload and is deserialized exactly once, here.
#[derive(Clone, Debug)]
pub struct RecordMetadata {
	pub tenant_id: String,
	pub product_id: String,
	pub title: String,
	pub product_type: String,
	pub vendor: String,
	pub profile: AttributeProfile,
	pub price: Option<f64>,
	pub available_for_sale: bool,
	pub image_url: Option<String>,
	pub product_url: Option<String>,
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct VectorRecord {
	pub point_id: Uuid,
	pub vector: Vec<f32>,
	pub metadata: RecordMetadata,
}

#[derive(Clone, Debug)]
pub struct ScoredRecord {
	pub point_id: String,
	pub score: f32,
	pub metadata: RecordMetadata,
}

#[derive(Clone, Debug, Default)]
pub struct SearchFilter {
	pub tenant_id: String,
	pub available_only: bool,
	pub price_min: Option<f64>,
	pub price_max: Option<f64>,
	pub material: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SearchParams {
	pub top_k: u64,
	pub filter: SearchFilter,
}

#[derive(Clone, Copy, Debug)]
pub struct StoreStats {
	pub total_vectors: u64,
	pub dimension: u32,
}

/// One live point per product per tenant; the point id is derived from
/// both, so re-upserts replace in place.
pub fn point_id_for(tenant_id: &str, product_id: &str) -> Uuid {
	let name = format!("{tenant_id}:{product_id}");

	Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &loft_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(&self.collection).await? {
			return Ok(());
		}

		self.client
			.create_collection(
				CreateCollectionBuilder::new(&self.collection).vectors_config(
					VectorParamsBuilder::new(self.vector_dim as u64, Distance::Cosine),
				),
			)
			.await?;

		tracing::info!(collection = %self.collection, "Created vector collection.");

		Ok(())
	}

	pub async fn upsert_records(&self, records: &[VectorRecord]) -> Result<()> {
		let mut points = Vec::with_capacity(records.len());

		for record in records {
			let payload = build_payload(&record.metadata)?;
			let point =
				PointStruct::new(record.point_id.to_string(), record.vector.clone(), payload);

			points.push(point);
		}

		let upsert = UpsertPointsBuilder::new(self.collection.clone(), points).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	pub async fn search(
		&self,
		query: &[f32],
		params: &SearchParams,
	) -> Result<Vec<ScoredRecord>> {
		let request = QueryPointsBuilder::new(&self.collection)
			.query(Query::new_nearest(query.to_vec()))
			.limit(params.top_k)
			.filter(build_filter(&params.filter))
			.with_payload(true);
		let response = self.client.query(request).await?;
		let mut records = Vec::with_capacity(response.result.len());

		for point in response.result {
			let point_id = point
				.id
				.as_ref()
				.and_then(|id| id.point_id_options.as_ref())
				.map(|options| match options {
					qdrant_client::qdrant::point_id::PointIdOptions::Uuid(value) => value.clone(),
					qdrant_client::qdrant::point_id::PointIdOptions::Num(value) =>
						value.to_string(),
				})
				.unwrap_or_default();
			let Some(metadata) = parse_payload(&point.payload) else {
				tracing::warn!(%point_id, "Skipping point with unreadable payload.");

				continue;
			};

			records.push(ScoredRecord { point_id, score: point.score, metadata });
		}

		Ok(records)
	}

	pub async fn delete_points(&self, point_ids: &[Uuid]) -> Result<()> {
		if point_ids.is_empty() {
			return Ok(());
		}

		let ids: Vec<PointId> =
			point_ids.iter().map(|id| PointId::from(id.to_string())).collect();
		let delete = DeletePointsBuilder::new(self.collection.clone()).points(ids).wait(true);

		self.client.delete_points(delete).await?;

		Ok(())
	}

	pub async fn delete_by_tenant(&self, tenant_id: &str) -> Result<()> {
		let filter = Filter::must([Condition::matches("tenant_id", tenant_id.to_string())]);
		let delete = DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true);

		self.client.delete_points(delete).await?;

		Ok(())
	}

	pub async fn stats(&self) -> Result<StoreStats> {
		let info = self.client.collection_info(&self.collection).await?;
		let total_vectors =
			info.result.and_then(|result| result.points_count).unwrap_or_default();

		Ok(StoreStats { total_vectors, dimension: self.vector_dim })
	}

	pub async fn healthy(&self) -> bool {
		self.client.health_check().await.is_ok()
	}
}

fn build_filter(filter: &SearchFilter) -> Filter {
	let mut conditions = vec![Condition::matches("tenant_id", filter.tenant_id.clone())];

	if filter.available_only {
		conditions.push(Condition::matches("available_for_sale", true));
	}
	if filter.price_min.is_some() || filter.price_max.is_some() {
		conditions.push(Condition::range(
			"price",
			Range { gt: None, gte: filter.price_min, lt: None, lte: filter.price_max },
		));
	}
	if let Some(material) = filter.material.as_ref() {
		conditions.push(Condition::matches("material", material.clone()));
	}

	Filter::must(conditions)
}

fn build_payload(metadata: &RecordMetadata) -> Result<Payload> {
	Ok(Payload::from(payload_map(metadata)?))
}

fn payload_map(metadata: &RecordMetadata) -> Result<HashMap<String, Value>> {
	let mut payload_map = HashMap::new();

	payload_map.insert("tenant_id".to_string(), Value::from(metadata.tenant_id.clone()));
	payload_map.insert("product_id".to_string(), Value::from(metadata.product_id.clone()));
	payload_map.insert("title".to_string(), Value::from(metadata.title.clone()));
	payload_map.insert("product_type".to_string(), Value::from(metadata.product_type.clone()));
	payload_map.insert("vendor".to_string(), Value::from(metadata.vendor.clone()));
	payload_map
		.insert("profile".to_string(), Value::from(serde_json::to_string(&metadata.profile)?));
	// Filterable copies of the fields recommendations narrow on.
	if let Some(material) = metadata.profile.material {
		payload_map.insert("material".to_string(), Value::from(material.as_str().to_string()));
	}
	if let Some(price) = metadata.price {
		payload_map.insert("price".to_string(), Value::from(price));
	}
	payload_map
		.insert("available_for_sale".to_string(), Value::from(metadata.available_for_sale));
	if let Some(image_url) = metadata.image_url.as_ref() {
		payload_map.insert("image_url".to_string(), Value::from(image_url.clone()));
	}
	if let Some(product_url) = metadata.product_url.as_ref() {
		payload_map.insert("product_url".to_string(), Value::from(product_url.clone()));
	}

	let updated_at = metadata
		.updated_at
		.format(&Rfc3339)
		.map_err(|_| crate::Error::InvalidArgument("Unformattable timestamp.".to_string()))?;

	payload_map.insert("updated_at".to_string(), Value::from(updated_at));

	Ok(payload_map)
}

fn parse_payload(payload: &HashMap<String, Value>) -> Option<RecordMetadata> {
	let profile_raw = payload_str(payload, "profile")?;
	let profile: AttributeProfile = serde_json::from_str(&profile_raw).ok()?;
	let updated_at = payload_str(payload, "updated_at")
		.and_then(|raw| OffsetDateTime::parse(&raw, &Rfc3339).ok())
		.unwrap_or(OffsetDateTime::UNIX_EPOCH);

	Some(RecordMetadata {
		tenant_id: payload_str(payload, "tenant_id")?,
		product_id: payload_str(payload, "product_id")?,
		title: payload_str(payload, "title").unwrap_or_default(),
		product_type: payload_str(payload, "product_type").unwrap_or_default(),
		vendor: payload_str(payload, "vendor").unwrap_or_default(),
		profile,
		price: payload_f64(payload, "price"),
		available_for_sale: payload_bool(payload, "available_for_sale").unwrap_or(false),
		image_url: payload_str(payload, "image_url"),
		product_url: payload_str(payload, "product_url"),
		updated_at,
	})
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	payload.get(key).and_then(|value| match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	})
}

fn payload_f64(payload: &HashMap<String, Value>, key: &str) -> Option<f64> {
	payload.get(key).and_then(|value| match &value.kind {
		Some(Kind::DoubleValue(number)) => Some(*number),
		Some(Kind::IntegerValue(number)) => Some(*number as f64),
		_ => None,
	})
}

fn payload_bool(payload: &HashMap<String, Value>, key: &str) -> Option<bool> {
	payload.get(key).and_then(|value| match &value.kind {
		Some(Kind::BoolValue(flag)) => Some(*flag),
		_ => None,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use loft_domain::{Firmness, Material};

	fn metadata() -> RecordMetadata {
		let mut profile = AttributeProfile::default();

		profile.firmness = Some(Firmness::MediumFirm);
		profile.material = Some(Material::Hybrid);
		profile.confidence = 0.9;

		RecordMetadata {
			tenant_id: "acme.example".to_string(),
			product_id: "gid://catalog/Product/1".to_string(),
			title: "Cloud Nine".to_string(),
			product_type: "Mattress".to_string(),
			vendor: "Acme Sleep".to_string(),
			profile,
			price: Some(899.0),
			available_for_sale: true,
			image_url: None,
			product_url: Some("https://acme.example/p/1".to_string()),
			updated_at: OffsetDateTime::UNIX_EPOCH,
		}
	}

	#[test]
	fn point_ids_are_deterministic_per_tenant_and_product() {
		let a = point_id_for("acme.example", "p1");
		let b = point_id_for("acme.example", "p1");
		let c = point_id_for("other.example", "p1");

		assert_eq!(a, b);
		assert_ne!(a, c);
	}

	#[test]
	fn payload_round_trips_through_parse() {
		let payload = payload_map(&metadata()).expect("build failed");
		let parsed = parse_payload(&payload).expect("parse failed");

		assert_eq!(parsed.tenant_id, "acme.example");
		assert_eq!(parsed.profile.firmness, Some(Firmness::MediumFirm));
		assert_eq!(parsed.price, Some(899.0));
		assert!(parsed.available_for_sale);
		assert_eq!(parsed.image_url, None);
	}

	#[test]
	fn filter_includes_only_requested_conditions() {
		let filter = build_filter(&SearchFilter {
			tenant_id: "acme.example".to_string(),
			available_only: true,
			price_min: Some(500.0),
			price_max: None,
			material: None,
		});

		assert_eq!(filter.must.len(), 3);
	}
}
