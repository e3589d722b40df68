use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructuredField {
	pub namespace: String,
	pub key: String,
	pub value: String,
}

/// One raw catalog entry as parsed from the bulk-export stream. Commerce
/// fields come from the item's first child variant record.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogItem {
	pub id: String,
	pub title: String,
	pub description: String,
	pub vendor: String,
	pub product_type: String,
	pub tags: Vec<String>,
	pub fields: Vec<StructuredField>,
	pub price: Option<f64>,
	pub available_for_sale: bool,
	pub image_url: Option<String>,
	pub product_url: Option<String>,
}
impl CatalogItem {
	/// All free text, lowercased, for keyword scans and heuristic rules.
	pub fn combined_text(&self) -> String {
		let mut parts = vec![
			self.title.as_str(),
			self.description.as_str(),
			self.vendor.as_str(),
			self.product_type.as_str(),
		];

		parts.extend(self.tags.iter().map(|tag| tag.as_str()));

		parts
			.into_iter()
			.filter(|part| !part.trim().is_empty())
			.collect::<Vec<_>>()
			.join(" ")
			.to_lowercase()
	}

	/// Stable digest over the fields that drive enrichment. Structured fields
	/// are sorted so upstream ordering noise does not defeat the cache.
	pub fn content_hash(&self) -> String {
		let mut fields: Vec<_> = self
			.fields
			.iter()
			.map(|field| (field.namespace.as_str(), field.key.as_str(), field.value.as_str()))
			.collect();

		fields.sort();

		let canonical = serde_json::json!({
			"title": self.title,
			"body": self.description,
			"vendor": self.vendor,
			"product_type": self.product_type,
			"tags": self.tags,
			"fields": fields,
		});

		blake3::hash(canonical.to_string().as_bytes()).to_hex().to_string()
	}
}
