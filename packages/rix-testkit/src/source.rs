use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};

use rix_domain::IndexedRoom;
use rix_providers::Error;
use rix_service::{BoxFuture, RoomSource};

/// Rooms service answering from a fixed map; unknown ids are not found.
#[derive(Default)]
pub struct StaticRooms {
	rooms: Mutex<HashMap<String, IndexedRoom>>,
	fetches: AtomicUsize,
	failing: AtomicBool,
	garbled: AtomicBool,
}
impl StaticRooms {
	pub fn insert(&self, room: IndexedRoom) {
		self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).insert(room.id.clone(), room);
	}

	pub fn fetch_count(&self) -> usize {
		self.fetches.load(Ordering::SeqCst)
	}

	/// Every fetch fails with a 503 while set.
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	/// Every fetch answers with an undecodable body while set.
	pub fn set_garbled(&self, garbled: bool) {
		self.garbled.store(garbled, Ordering::SeqCst);
	}
}

impl RoomSource for StaticRooms {
	fn fetch_room<'a>(
		&'a self,
		room_id: &'a str,
	) -> BoxFuture<'a, rix_providers::Result<IndexedRoom>> {
		Box::pin(async move {
			self.fetches.fetch_add(1, Ordering::SeqCst);

			if self.failing.load(Ordering::SeqCst) {
				return Err(Error::Status { status: 503, body: "rooms service unavailable".to_string() });
			}
			if self.garbled.load(Ordering::SeqCst) {
				return Err(Error::InvalidResponse {
					message: format!("Rooms service returned undecodable JSON for room {room_id}."),
				});
			}

			self.rooms
				.lock()
				.unwrap_or_else(|poisoned| poisoned.into_inner())
				.get(room_id)
				.cloned()
				.ok_or_else(|| Error::NotFound { room_id: room_id.to_string() })
		})
	}
}
