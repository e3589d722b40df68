use crate::item::CatalogItem;

/// Stage 1 verdict for one catalog item. `Match` and `NonMatch` are settled
/// without any network call; only `Uncertain` items go to the classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
	Match,
	NonMatch,
	Uncertain,
}

/// Domain keywords across the languages the catalogs actually ship in.
const MATTRESS_KEYWORDS: [&str; 18] = [
	"mattress",
	"mattresses",
	"matelas",
	"colchón",
	"colchon",
	"colchão",
	"colchao",
	"matratze",
	"materasso",
	"materassi",
	"matras",
	"madrass",
	"patja",
	"στρώμα",
	"матрас",
	"床垫",
	"マットレス",
	"매트리스",
];

/// Accessory terms that name a different product even when "mattress"
/// appears alongside them (toppers, protectors, bedding, furniture).
const ACCESSORY_KEYWORDS: [&str; 16] = [
	"topper",
	"protector",
	"encasement",
	"pillow",
	"pillowcase",
	"sheet",
	"sheets",
	"duvet",
	"comforter",
	"blanket",
	"bed frame",
	"headboard",
	"foundation",
	"box spring",
	"bunkie board",
	"nightstand",
];

/// Weak signals that keep an item in play for Stage 2 instead of dropping it.
const ADJACENT_KEYWORDS: [&str; 8] =
	["bed", "sleep", "foam", "hybrid", "innerspring", "coil", "plush", "firm"];

pub fn bucket(item: &CatalogItem) -> Bucket {
	let title = item.title.to_lowercase();
	let product_type = item.product_type.to_lowercase();

	if contains_any(&title, &ACCESSORY_KEYWORDS) || contains_any(&product_type, &ACCESSORY_KEYWORDS)
	{
		return Bucket::NonMatch;
	}

	let tags = item.tags.join(" ").to_lowercase();

	if contains_any(&title, &MATTRESS_KEYWORDS)
		|| contains_any(&product_type, &MATTRESS_KEYWORDS)
		|| contains_any(&tags, &MATTRESS_KEYWORDS)
	{
		return Bucket::Match;
	}

	let description = item.description.to_lowercase();

	if contains_any(&description, &MATTRESS_KEYWORDS)
		|| contains_any(&title, &ADJACENT_KEYWORDS)
		|| contains_any(&product_type, &ADJACENT_KEYWORDS)
		|| contains_any(&description, &ADJACENT_KEYWORDS)
	{
		return Bucket::Uncertain;
	}

	Bucket::NonMatch
}

/// Keyword-only substitute for Stage 2 when the uncertain bucket is too
/// large to classify affordably. Stricter than the model: the item must name
/// the domain outright in its description.
pub fn conservative_fallback(item: &CatalogItem) -> bool {
	contains_any(&item.description.to_lowercase(), &MATTRESS_KEYWORDS)
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
	keywords.iter().any(|keyword| text.contains(keyword))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(title: &str, product_type: &str, description: &str) -> CatalogItem {
		CatalogItem {
			id: "gid://catalog/Product/1".to_string(),
			title: title.to_string(),
			product_type: product_type.to_string(),
			description: description.to_string(),
			..Default::default()
		}
	}

	#[test]
	fn titled_mattress_is_a_definite_match() {
		assert_eq!(bucket(&item("Cloud Nine Mattress", "", "")), Bucket::Match);
		assert_eq!(bucket(&item("Matelas Hybride", "", "")), Bucket::Match);
		assert_eq!(bucket(&item("Colchón Premium", "", "")), Bucket::Match);
	}

	#[test]
	fn typed_mattress_is_a_definite_match() {
		assert_eq!(bucket(&item("Cloud Nine", "Mattress", "")), Bucket::Match);
	}

	#[test]
	fn accessory_wins_over_mattress_mention() {
		assert_eq!(bucket(&item("Mattress Topper Deluxe", "", "")), Bucket::NonMatch);
		assert_eq!(bucket(&item("Waterproof Mattress Protector", "", "")), Bucket::NonMatch);
		assert_eq!(bucket(&item("Bamboo Sheets", "Bedding", "")), Bucket::NonMatch);
	}

	#[test]
	fn vague_bed_product_is_uncertain() {
		assert_eq!(
			bucket(&item("Model 7", "", "A plush foam sleep surface.")),
			Bucket::Uncertain
		);
	}

	#[test]
	fn unrelated_product_is_a_definite_non_match() {
		assert_eq!(bucket(&item("Ceramic Mug", "Kitchen", "Holds coffee.")), Bucket::NonMatch);
	}

	#[test]
	fn fallback_requires_explicit_domain_mention() {
		assert!(conservative_fallback(&item("Model 7", "", "A 12 inch mattress in a box.")));
		assert!(!conservative_fallback(&item("Model 7", "", "A plush foam sleep surface.")));
	}
}
