use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::room::{IndexedRoom, RoomStatus, RoomType};

/// Search parameters as presented by a caller, before validation and defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomSearchRequest {
	#[serde(default)]
	pub q: Option<String>,
	#[serde(default, rename = "type")]
	pub room_type: Option<RoomType>,
	#[serde(default)]
	pub status: Option<RoomStatus>,
	#[serde(default)]
	pub floor: Option<i64>,
	#[serde(default)]
	pub min_price: Option<f64>,
	#[serde(default)]
	pub max_price: Option<f64>,
	#[serde(default)]
	pub has_wifi: Option<bool>,
	#[serde(default)]
	pub has_ac: Option<bool>,
	#[serde(default)]
	pub has_tv: Option<bool>,
	#[serde(default)]
	pub has_minibar: Option<bool>,
	#[serde(default)]
	pub sort: Option<String>,
	#[serde(default)]
	pub page: Option<i64>,
	#[serde(default)]
	pub limit: Option<i64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
	PriceAsc,
	PriceDesc,
	CapacityAsc,
	CapacityDesc,
	#[default]
	Default,
}
impl SortOrder {
	/// Unrecognized tokens fall back to [`SortOrder::Default`] so reads stay available.
	pub fn parse(token: &str) -> Self {
		match token.trim().to_ascii_lowercase().as_str() {
			"price_asc" => Self::PriceAsc,
			"price_desc" => Self::PriceDesc,
			"capacity_asc" => Self::CapacityAsc,
			"capacity_desc" => Self::CapacityDesc,
			_ => Self::Default,
		}
	}
}

/// A validated, defaulted search. Its serde form is the canonical cache-key input, so every
/// optional filter is always present and fields keep a fixed order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RoomQuery {
	pub text: Option<String>,
	pub room_type: Option<RoomType>,
	pub status: Option<RoomStatus>,
	pub floor: Option<i64>,
	pub min_price: Option<f64>,
	pub max_price: Option<f64>,
	pub has_wifi: Option<bool>,
	pub has_ac: Option<bool>,
	pub has_tv: Option<bool>,
	pub has_minibar: Option<bool>,
	pub sort: SortOrder,
	pub page: u32,
	pub limit: u32,
}
impl RoomQuery {
	/// Zero-based row offset of the requested page.
	pub fn start(&self) -> u64 {
		u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
	}
}

/// One page of engine results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryPage {
	pub docs: Vec<IndexedRoom>,
	pub total: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	pub page: u32,
	pub limit: u32,
	pub total: u64,
	pub results: Vec<IndexedRoom>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionResponse {
	pub suggestions: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetCounts {
	pub room_types: BTreeMap<String, u64>,
	pub status_counts: BTreeMap<String, u64>,
	pub floor_counts: BTreeMap<i64, u64>,
	pub amenity_counts: BTreeMap<String, u64>,
	pub price_ranges: Vec<PriceRange>,
}

/// Half-open price bucket `[min, max)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
	pub min: f64,
	pub max: f64,
	pub count: u64,
}
