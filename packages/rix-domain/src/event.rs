use serde::Deserialize;
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::room::RoomStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
	Created,
	Updated,
	Deleted,
	StatusChanged,
	ReservationCreated,
	ReservationCanceled,
}
impl EventKind {
	/// Accepts routing keys (`room.created`) as well as bare event types (`created`).
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"room.created" | "created" => Some(Self::Created),
			"room.updated" | "updated" => Some(Self::Updated),
			"room.deleted" | "deleted" => Some(Self::Deleted),
			"room.status.changed" | "status.changed" | "status_changed" =>
				Some(Self::StatusChanged),
			"reservation.created" => Some(Self::ReservationCreated),
			"reservation.canceled" | "reservation.cancelled" => Some(Self::ReservationCanceled),
			_ => None,
		}
	}

	pub fn routing_key(&self) -> &'static str {
		match self {
			Self::Created => "room.created",
			Self::Updated => "room.updated",
			Self::Deleted => "room.deleted",
			Self::StatusChanged => "room.status.changed",
			Self::ReservationCreated => "reservation.created",
			Self::ReservationCanceled => "reservation.canceled",
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
	#[error("Change event is not valid JSON: {0}")]
	Json(#[from] serde_json::Error),
	#[error("Change event kind {0:?} is not recognized.")]
	UnknownKind(String),
	#[error("Change event is missing room_id.")]
	MissingRoomId,
	#[error("Change event timestamp {0:?} is not RFC 3339.")]
	InvalidTimestamp(String),
	#[error("Status change event carries no usable status.")]
	MissingStatus,
}
impl DecodeError {
	/// Unknown kinds are well-formed messages this consumer does not handle.
	pub fn is_unknown_kind(&self) -> bool {
		matches!(self, Self::UnknownKind(_))
	}
}

/// A decoded notification that an authoritative room record changed.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
	pub kind: EventKind,
	pub room_id: String,
	/// Embedded room fields, possibly partial.
	pub payload: Option<Value>,
	/// Target status of a [`EventKind::StatusChanged`] event.
	pub new_status: Option<RoomStatus>,
	pub timestamp: Option<OffsetDateTime>,
}
impl ChangeEvent {
	pub fn decode(raw: &[u8], routing_key: &str) -> Result<Self, DecodeError> {
		let wire: WireEvent = serde_json::from_slice(raw)?;
		let kind = wire
			.event_type
			.as_deref()
			.and_then(EventKind::parse)
			.or_else(|| EventKind::parse(routing_key))
			.ok_or_else(|| {
				DecodeError::UnknownKind(wire.event_type.clone().unwrap_or_else(|| routing_key.to_string()))
			})?;
		let payload = wire.data.filter(Value::is_object);
		let room_id = wire
			.room_id
			.as_ref()
			.and_then(id_to_string)
			.or_else(|| payload.as_ref().and_then(|data| data.get("id")).and_then(id_to_string))
			.ok_or(DecodeError::MissingRoomId)?;
		let timestamp = match wire.timestamp.as_deref().map(str::trim) {
			Some(raw) if !raw.is_empty() => Some(
				OffsetDateTime::parse(raw, &Rfc3339)
					.map_err(|_| DecodeError::InvalidTimestamp(raw.to_string()))?,
			),
			_ => None,
		};
		let new_status = if kind == EventKind::StatusChanged {
			let status = wire
				.new_status
				.as_deref()
				.or(wire.status.as_deref())
				.and_then(RoomStatus::parse)
				.ok_or(DecodeError::MissingStatus)?;

			Some(status)
		} else {
			None
		};

		Ok(Self { kind, room_id, payload, new_status, timestamp })
	}

	/// Status implied by a status-only event.
	pub fn target_status(&self) -> Option<RoomStatus> {
		match self.kind {
			EventKind::StatusChanged => self.new_status,
			EventKind::ReservationCreated => Some(RoomStatus::Reserved),
			EventKind::ReservationCanceled => Some(RoomStatus::Available),
			_ => None,
		}
	}
}

#[derive(Debug, Deserialize)]
struct WireEvent {
	#[serde(default)]
	event_type: Option<String>,
	#[serde(default)]
	room_id: Option<Value>,
	#[serde(default)]
	timestamp: Option<String>,
	#[serde(default, alias = "payload", alias = "room")]
	data: Option<Value>,
	#[serde(default)]
	new_status: Option<String>,
	#[serde(default)]
	status: Option<String>,
}

fn id_to_string(value: &Value) -> Option<String> {
	let id = match value {
		Value::String(text) => text.trim().to_string(),
		Value::Number(number) => number.to_string(),
		_ => return None,
	};

	(!id.is_empty()).then_some(id)
}
