//! Change event dispatch: decode, write the index, invalidate, and decide the broker outcome.

// std
use std::{
	collections::hash_map::DefaultHasher,
	hash::{Hash, Hasher},
};

// crates.io
use time::OffsetDateTime;
use tokio::sync::{Mutex, MutexGuard};

// self
use crate::{Error, Result, RixService};
use rix_domain::{ChangeEvent, EventKind, IndexedRoom};

pub const DEFAULT_LANES: usize = 64;

/// Broker verdict for one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Ack,
	Reject { requeue: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
	Written,
	Stale,
	Missing,
}

/// Fixed set of locks keyed by subject id hash. Events for one id never run concurrently;
/// unrelated ids only contend when they share a lane.
pub struct SubjectLanes {
	lanes: Vec<Mutex<()>>,
}
impl SubjectLanes {
	pub fn new(count: usize) -> Self {
		Self { lanes: (0..count.max(1)).map(|_| Mutex::new(())).collect() }
	}

	pub fn lane_of(&self, subject: &str) -> usize {
		let mut hasher = DefaultHasher::new();

		subject.hash(&mut hasher);

		(hasher.finish() % self.lanes.len() as u64) as usize
	}

	pub async fn lock(&self, subject: &str) -> MutexGuard<'_, ()> {
		self.lanes[self.lane_of(subject)].lock().await
	}
}

impl RixService {
	pub async fn handle_change(&self, raw: &[u8], routing_key: &str) -> Outcome {
		let event = match ChangeEvent::decode(raw, routing_key) {
			Ok(event) => event,
			Err(err) if err.is_unknown_kind() => {
				tracing::warn!(routing_key, error = %err, "Ignoring change event of unknown kind.");

				return Outcome::Ack;
			},
			Err(err) => {
				tracing::warn!(routing_key, error = %err, "Rejecting malformed change event.");

				return Outcome::Reject { requeue: false };
			},
		};
		let room_id = event.room_id.as_str();
		let kind = event.kind.routing_key();

		match self.apply_change(&event, OffsetDateTime::now_utc()).await {
			Ok(Applied::Written) => {
				self.cache.invalidate_all();
				tracing::info!(room_id, routing_key, kind, "Change event applied.");

				Outcome::Ack
			},
			Ok(Applied::Stale) => {
				tracing::warn!(room_id, routing_key, kind, "Skipping change event older than the indexed document.");

				Outcome::Ack
			},
			Ok(Applied::Missing) => {
				tracing::warn!(room_id, routing_key, kind, "Change event subject is not indexed.");

				Outcome::Ack
			},
			Err(Error::NotFound { message }) => {
				tracing::warn!(room_id, routing_key, kind, detail = %message, "Change event subject not found.");

				Outcome::Ack
			},
			Err(err) => {
				let requeue = err.is_transient();

				tracing::error!(room_id, routing_key, kind, error = %err, requeue, "Change event dispatch failed.");

				Outcome::Reject { requeue }
			},
		}
	}

	/// `received_at` stands in for events that carry no timestamp.
	async fn apply_change(&self, event: &ChangeEvent, received_at: OffsetDateTime) -> Result<Applied> {
		let _lane = self.lanes.lock(&event.room_id).await;
		let applied_at = event.timestamp.unwrap_or(received_at);
		let current = self.index.get(&event.room_id).await?;

		if is_stale(current.as_ref(), applied_at) {
			return Ok(Applied::Stale);
		}

		match event.kind {
			EventKind::Created | EventKind::Updated => {
				let room = match event.payload.as_ref().and_then(IndexedRoom::from_complete_document) {
					Some(room) => room,
					None => self.source.fetch_room(&event.room_id).await?,
				};

				self.write(room, &event.room_id, applied_at).await
			},
			EventKind::Deleted => {
				if current.is_none() {
					return Ok(Applied::Missing);
				}

				self.index.delete(&event.room_id).await?;

				Ok(Applied::Written)
			},
			EventKind::StatusChanged | EventKind::ReservationCreated | EventKind::ReservationCanceled => {
				let status = event.target_status().ok_or_else(|| Error::Decode {
					message: format!("{} event carries no status.", event.kind.routing_key()),
				})?;
				let base = match current {
					Some(room) => room,
					None => self.source.fetch_room(&event.room_id).await?,
				};

				self.write(base.with_status(status), &event.room_id, applied_at).await
			},
		}
	}

	async fn write(
		&self,
		mut room: IndexedRoom,
		room_id: &str,
		applied_at: OffsetDateTime,
	) -> Result<Applied> {
		room.id = room_id.to_string();
		room.applied_at = Some(applied_at);

		self.index.upsert(&room).await?;

		Ok(Applied::Written)
	}
}

/// Strictly older events lose; an equal timestamp re-applies so redeliveries stay idempotent.
fn is_stale(current: Option<&IndexedRoom>, applied_at: OffsetDateTime) -> bool {
	current.and_then(|room| room.applied_at).is_some_and(|stored| applied_at < stored)
}
