// std
use std::time::Duration;

// crates.io
use reqwest::{Client, StatusCode};
use serde_json::Value;

// self
use crate::{Error, Result};
use rix_domain::IndexedRoom;

/// Read-only client for the authoritative rooms service.
#[derive(Clone)]
pub struct RoomsClient {
	client: Client,
	api_base: String,
	rooms_path: String,
}
impl RoomsClient {
	pub fn new(cfg: &rix_config::Source) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, api_base: cfg.api_base.clone(), rooms_path: cfg.rooms_path.clone() })
	}

	pub fn room_url(&self, room_id: &str) -> String {
		format!("{}{}/{}", self.api_base, self.rooms_path, room_id)
	}

	pub async fn fetch_room(&self, room_id: &str) -> Result<IndexedRoom> {
		let res = self.client.get(self.room_url(room_id)).send().await?;
		let status = res.status();

		if status == StatusCode::NOT_FOUND {
			return Err(Error::NotFound { room_id: room_id.to_string() });
		}
		if !status.is_success() {
			let body = res.text().await.unwrap_or_default();

			return Err(Error::Status { status: status.as_u16(), body });
		}

		let body = res.bytes().await?;
		let json: Value = serde_json::from_slice(&body).map_err(|err| Error::InvalidResponse {
			message: format!("Rooms service returned undecodable JSON for room {room_id}: {err}"),
		})?;

		parse_room_response(json, room_id)
	}
}

fn parse_room_response(json: Value, room_id: &str) -> Result<IndexedRoom> {
	let doc = ["room", "data"]
		.iter()
		.find_map(|key| json.get(*key).filter(|inner| inner.is_object()))
		.unwrap_or(&json);

	if !doc.is_object() {
		return Err(Error::InvalidResponse {
			message: format!("Rooms service returned a non-object body for room {room_id}."),
		});
	}

	let mut room = IndexedRoom::from_document(doc);

	if room.id.is_empty() {
		room.id = room_id.to_string();
	}

	Ok(room)
}
