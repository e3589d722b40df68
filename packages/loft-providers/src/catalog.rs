use std::{collections::HashMap, time::Duration};

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

use loft_domain::{CatalogItem, StructuredField};

/// Per-tenant upstream access, resolved from storage at job start.
#[derive(Clone, Debug)]
pub struct CatalogAccess {
	pub api_base: String,
	pub access_token: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportState {
	Running,
	Completed,
	Failed,
}

#[derive(Clone, Debug)]
pub struct ExportStatus {
	pub state: ExportState,
	pub object_count: u64,
	pub download_url: Option<String>,
}

/// Asks the catalog source to export the full product set. Returns the
/// operation id to poll.
pub async fn start_bulk_export(
	cfg: &loft_config::Catalog,
	access: &CatalogAccess,
) -> Result<String> {
	let client = http_client(cfg)?;
	let url = format!("{}/bulk_exports", access.api_base);
	let body = serde_json::json!({ "resource": "products" });
	let res = client
		.post(url)
		.header("X-Access-Token", access.access_token.as_str())
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	if let Some(errors) = json.get("errors").and_then(|value| value.as_array())
		&& !errors.is_empty()
	{
		return Err(eyre::eyre!("Bulk export request was rejected: {errors:?}."));
	}

	json.get("operation_id")
		.and_then(|value| value.as_str())
		.map(|value| value.to_string())
		.ok_or_else(|| eyre::eyre!("Bulk export response is missing operation_id."))
}

pub async fn poll_bulk_export(
	cfg: &loft_config::Catalog,
	access: &CatalogAccess,
	operation_id: &str,
) -> Result<ExportStatus> {
	let client = http_client(cfg)?;
	let url = format!("{}/bulk_exports/{operation_id}", access.api_base);
	let res =
		client.get(url).header("X-Access-Token", access.access_token.as_str()).send().await?;
	let json: Value = res.error_for_status()?.json().await?;
	let state = match json.get("status").and_then(|value| value.as_str()) {
		Some("completed") => ExportState::Completed,
		Some("failed") | Some("canceled") => ExportState::Failed,
		_ => ExportState::Running,
	};

	Ok(ExportStatus {
		state,
		object_count: json.get("object_count").and_then(|value| value.as_u64()).unwrap_or(0),
		download_url: json
			.get("download_url")
			.and_then(|value| value.as_str())
			.map(|value| value.to_string()),
	})
}

pub async fn download_export(cfg: &loft_config::Catalog, url: &str) -> Result<String> {
	let client = http_client(cfg)?;
	let res = client.get(url).send().await?;

	Ok(res.error_for_status()?.text().await?)
}

fn http_client(cfg: &loft_config::Catalog) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(cfg.request_timeout_ms)).build()?)
}

/// Parses the newline-delimited export stream. Each line is either a
/// top-level product or a child record pointing at its parent via
/// `__parentId`; the first child supplies the commerce fields. Malformed
/// lines and orphaned children are skipped.
pub fn parse_export_body(body: &str) -> Vec<CatalogItem> {
	let mut items: Vec<CatalogItem> = Vec::new();
	let mut index_by_id: HashMap<String, usize> = HashMap::new();

	for line in body.lines() {
		let trimmed = line.trim();

		if trimmed.is_empty() {
			continue;
		}

		let Ok(record) = serde_json::from_str::<Value>(trimmed) else {
			tracing::warn!("Skipping malformed export line.");

			continue;
		};

		if let Some(parent_id) = record.get("__parentId").and_then(|value| value.as_str()) {
			let Some(&index) = index_by_id.get(parent_id) else {
				continue;
			};

			apply_child_record(&mut items[index], &record);

			continue;
		}

		let Some(item) = parse_item_record(&record) else {
			continue;
		};

		index_by_id.insert(item.id.clone(), items.len());
		items.push(item);
	}

	items
}

fn parse_item_record(record: &Value) -> Option<CatalogItem> {
	let id = record.get("id")?.as_str()?.to_string();
	let title = record.get("title")?.as_str()?.to_string();
	let fields = record
		.get("fields")
		.and_then(|value| value.as_array())
		.map(|entries| {
			entries
				.iter()
				.filter_map(|entry| {
					Some(StructuredField {
						namespace: entry.get("namespace")?.as_str()?.to_string(),
						key: entry.get("key")?.as_str()?.to_string(),
						value: entry.get("value")?.as_str()?.to_string(),
					})
				})
				.collect()
		})
		.unwrap_or_default();

	Some(CatalogItem {
		id,
		title,
		description: string_field(record, "description"),
		vendor: string_field(record, "vendor"),
		product_type: string_field(record, "product_type"),
		tags: record
			.get("tags")
			.and_then(|value| value.as_array())
			.map(|entries| {
				entries
					.iter()
					.filter_map(|entry| entry.as_str())
					.map(|entry| entry.to_string())
					.collect()
			})
			.unwrap_or_default(),
		fields,
		price: None,
		available_for_sale: false,
		image_url: None,
		product_url: None,
	})
}

fn apply_child_record(item: &mut CatalogItem, record: &Value) {
	if item.price.is_none() {
		item.price = record
			.get("price")
			.and_then(|value| value.as_f64().or_else(|| value.as_str()?.parse().ok()));
		item.available_for_sale = record
			.get("available_for_sale")
			.and_then(|value| value.as_bool())
			.unwrap_or(item.available_for_sale);
	}
	if item.image_url.is_none() {
		item.image_url = record
			.get("image_url")
			.and_then(|value| value.as_str())
			.map(|value| value.to_string());
	}
	if item.product_url.is_none() {
		item.product_url = record
			.get("product_url")
			.and_then(|value| value.as_str())
			.map(|value| value.to_string());
	}
}

fn string_field(record: &Value, key: &str) -> String {
	record.get(key).and_then(|value| value.as_str()).unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_parent_and_child_records() {
		let body = r#"
{"id": "p1", "title": "Cloud Nine Mattress", "product_type": "Mattress", "tags": ["cooling"]}
{"__parentId": "p1", "price": "899.00", "available_for_sale": true}
{"id": "p2", "title": "Bamboo Sheets"}
"#;
		let items = parse_export_body(body);

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].id, "p1");
		assert_eq!(items[0].price, Some(899.0));
		assert!(items[0].available_for_sale);
		assert_eq!(items[1].id, "p2");
		assert_eq!(items[1].price, None);
	}

	#[test]
	fn first_child_record_wins() {
		let body = r#"
{"id": "p1", "title": "Cloud Nine Mattress"}
{"__parentId": "p1", "price": 899.0, "available_for_sale": true}
{"__parentId": "p1", "price": 1099.0, "available_for_sale": false}
"#;
		let items = parse_export_body(body);

		assert_eq!(items[0].price, Some(899.0));
		assert!(items[0].available_for_sale);
	}

	#[test]
	fn skips_malformed_lines_and_orphans() {
		let body = r#"
not json at all
{"__parentId": "missing", "price": 10.0}
{"id": "p1", "title": "Cloud Nine Mattress"}
"#;
		let items = parse_export_body(body);

		assert_eq!(items.len(), 1);
		assert_eq!(items[0].id, "p1");
	}

	#[test]
	fn structured_fields_parse_from_export() {
		let body = r#"{"id": "p1", "title": "Cloud Nine", "fields": [{"namespace": "custom", "key": "firmness", "value": "firm"}]}"#;
		let items = parse_export_body(body);

		assert_eq!(items[0].fields.len(), 1);
		assert_eq!(items[0].fields[0].key, "firmness");
	}
}
