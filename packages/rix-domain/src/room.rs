use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::normalize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
	Single,
	Double,
	Suite,
	Deluxe,
	Standard,
	#[default]
	#[serde(rename = "")]
	Unspecified,
}
impl RoomType {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"single" => Some(Self::Single),
			"double" => Some(Self::Double),
			"suite" => Some(Self::Suite),
			"deluxe" => Some(Self::Deluxe),
			"standard" => Some(Self::Standard),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Single => "single",
			Self::Double => "double",
			Self::Suite => "suite",
			Self::Deluxe => "deluxe",
			Self::Standard => "standard",
			Self::Unspecified => "",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
	Available,
	Occupied,
	Maintenance,
	Reserved,
	#[default]
	#[serde(rename = "")]
	Unspecified,
}
impl RoomStatus {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"available" => Some(Self::Available),
			"occupied" => Some(Self::Occupied),
			"maintenance" => Some(Self::Maintenance),
			"reserved" => Some(Self::Reserved),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Available => "available",
			Self::Occupied => "occupied",
			Self::Maintenance => "maintenance",
			Self::Reserved => "reserved",
			Self::Unspecified => "",
		}
	}
}

/// Denormalized search document.
///
/// Field names double as the index engine's field names, so the serde form of this struct
/// is the write format. Reads go through [`IndexedRoom::from_document`] instead, because the
/// engine may hand any field back as a one-element sequence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexedRoom {
	pub id: String,
	pub number: String,
	#[serde(rename = "type")]
	pub room_type: RoomType,
	pub status: RoomStatus,
	pub price: f64,
	#[serde(default)]
	pub description: String,
	pub capacity: i64,
	pub floor: i64,
	pub has_wifi: bool,
	pub has_ac: bool,
	pub has_tv: bool,
	pub has_minibar: bool,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub created_at: Option<OffsetDateTime>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub updated_at: Option<OffsetDateTime>,
	/// Timestamp of the change event last written into this document.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub applied_at: Option<OffsetDateTime>,
}
impl IndexedRoom {
	/// Fields a change payload must carry before it can replace a stored document.
	pub const REQUIRED_FIELDS: [&'static str; 6] =
		["number", "type", "status", "price", "capacity", "floor"];

	pub fn from_document(doc: &Value) -> Self {
		Self {
			id: normalize::string_field(doc, "id"),
			number: normalize::string_field(doc, "number"),
			room_type: normalize::opt_string(doc, "type")
				.and_then(|raw| RoomType::parse(&raw))
				.unwrap_or_default(),
			status: normalize::opt_string(doc, "status")
				.and_then(|raw| RoomStatus::parse(&raw))
				.unwrap_or_default(),
			price: normalize::f64_field(doc, "price"),
			description: normalize::string_field(doc, "description"),
			capacity: normalize::i64_field(doc, "capacity"),
			floor: normalize::i64_field(doc, "floor"),
			has_wifi: normalize::bool_field(doc, "has_wifi"),
			has_ac: normalize::bool_field(doc, "has_ac"),
			has_tv: normalize::bool_field(doc, "has_tv"),
			has_minibar: normalize::bool_field(doc, "has_minibar"),
			created_at: normalize::timestamp_field(doc, "created_at"),
			updated_at: normalize::timestamp_field(doc, "updated_at"),
			applied_at: normalize::timestamp_field(doc, "applied_at"),
		}
	}

	/// Decodes `doc` only if it carries every field in [`Self::REQUIRED_FIELDS`].
	pub fn from_complete_document(doc: &Value) -> Option<Self> {
		let complete = Self::REQUIRED_FIELDS
			.iter()
			.all(|field| normalize::first(doc.get(*field)).is_some());

		complete.then(|| Self::from_document(doc))
	}

	pub fn with_status(mut self, status: RoomStatus) -> Self {
		self.status = status;

		self
	}
}
