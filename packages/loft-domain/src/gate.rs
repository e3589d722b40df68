use crate::item::CatalogItem;

pub const WEAK_DESCRIPTION_CHARS: usize = 100;
pub const WEAK_CONFIDENCE: f32 = 0.5;

/// Title words that carry enough material/firmness signal to skip the
/// costlier retrieval-backed enrichment.
const TITLE_SIGNAL_KEYWORDS: [&str; 9] =
	["memory", "foam", "latex", "spring", "hybrid", "firm", "soft", "plush", "coil"];

/// Decides whether an item's own data is too sparse to enrich locally.
/// Triggers on (short description AND low confidence so far) or (no
/// structured fields AND a title with no recognizable signal).
pub fn is_weak_data(item: &CatalogItem, confidence: f32) -> bool {
	let weak_description = item.description.trim().chars().count() < WEAK_DESCRIPTION_CHARS;
	let low_confidence = confidence < WEAK_CONFIDENCE;
	let no_fields = item.fields.is_empty();
	let title = item.title.to_lowercase();
	let vague_title = !TITLE_SIGNAL_KEYWORDS.iter().any(|keyword| title.contains(keyword));

	(weak_description && low_confidence) || (no_fields && vague_title)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::item::StructuredField;

	#[test]
	fn sparse_item_with_vague_title_is_weak() {
		let item = CatalogItem {
			id: "gid://catalog/Product/1".to_string(),
			title: "Sleep Co. Model 7".to_string(),
			..Default::default()
		};

		assert!(is_weak_data(&item, 0.0));
	}

	#[test]
	fn long_description_with_confidence_is_not_weak() {
		let item = CatalogItem {
			id: "gid://catalog/Product/2".to_string(),
			title: "Sleep Co. Model 7".to_string(),
			description: "x".repeat(200),
			fields: vec![StructuredField {
				namespace: "custom".to_string(),
				key: "firmness".to_string(),
				value: "firm".to_string(),
			}],
			..Default::default()
		};

		assert!(!is_weak_data(&item, 0.9));
	}

	#[test]
	fn signal_bearing_title_offsets_missing_fields() {
		let item = CatalogItem {
			id: "gid://catalog/Product/3".to_string(),
			title: "Plush Memory Foam 12\"".to_string(),
			description: "x".repeat(200),
			..Default::default()
		};

		assert!(!is_weak_data(&item, 0.8));
	}

	#[test]
	fn short_description_alone_is_not_weak_at_high_confidence() {
		let item = CatalogItem {
			id: "gid://catalog/Product/4".to_string(),
			title: "Firm Hybrid Mattress".to_string(),
			description: "Short.".to_string(),
			fields: vec![StructuredField {
				namespace: "custom".to_string(),
				key: "material".to_string(),
				value: "hybrid".to_string(),
			}],
			..Default::default()
		};

		assert!(!is_weak_data(&item, 1.0));
	}
}
