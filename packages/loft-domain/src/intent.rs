use serde::{Deserialize, Serialize};

use crate::profile::{Firmness, Material};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SleepPosition {
	Side,
	Back,
	Stomach,
	Combination,
}
impl SleepPosition {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Side => "side",
			Self::Back => "back",
			Self::Stomach => "stomach",
			Self::Combination => "combination",
		}
	}

	pub fn ideal_firmness(self) -> Firmness {
		match self {
			Self::Side => Firmness::MediumSoft,
			Self::Back | Self::Combination => Firmness::Medium,
			Self::Stomach => Firmness::MediumFirm,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyType {
	Petite,
	Average,
	Athletic,
	PlusSize,
}
impl BodyType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Petite => "petite",
			Self::Average => "average",
			Self::Athletic => "athletic",
			Self::PlusSize => "plus-size",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetRange {
	pub min: Option<f64>,
	pub max: Option<f64>,
}

/// Request-scoped shopper preferences. Never persisted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopperIntent {
	pub firmness: Option<Firmness>,
	pub budget: Option<BudgetRange>,
	pub sleep_position: Option<SleepPosition>,
	pub body_type: Option<BodyType>,
	pub sleep_issues: Vec<String>,
	pub preferred_material: Option<Material>,
	pub cooling_preference: bool,
	pub motion_isolation: bool,
	pub edge_support: bool,
	pub organic: bool,
	pub certifications: Vec<String>,
	pub raw_query: Option<String>,
}
