// std
use std::sync::atomic::{AtomicU64, Ordering};

// crates.io
use serde::Serialize;
use time::OffsetDateTime;

// self
use crate::RixService;

const PROBE_TTL_SECONDS: u64 = 10;

static PROBE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Ok,
	/// The engine is reachable but the shared cache is not; reads still succeed, uncached.
	Degraded,
	Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ComponentHealth {
	Up,
	Down { error: String },
	Disabled,
}
impl ComponentHealth {
	fn is_down(&self) -> bool {
		matches!(self, Self::Down { .. })
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
	pub status: HealthStatus,
	pub index: ComponentHealth,
	pub shared_cache: ComponentHealth,
}

impl RixService {
	pub async fn health(&self) -> HealthReport {
		let index = match self.index.ping().await {
			Ok(()) => ComponentHealth::Up,
			Err(err) => ComponentHealth::Down { error: err.to_string() },
		};
		let shared_cache = self.probe_shared_cache().await;
		let status = if index.is_down() {
			HealthStatus::Down
		} else if shared_cache.is_down() {
			HealthStatus::Degraded
		} else {
			HealthStatus::Ok
		};

		if status != HealthStatus::Ok {
			tracing::warn!(?index, ?shared_cache, "Health check found unavailable dependencies.");
		}

		HealthReport { status, index, shared_cache }
	}

	async fn probe_shared_cache(&self) -> ComponentHealth {
		let Some(shared) = self.cache.shared() else {
			return ComponentHealth::Disabled;
		};

		let key = probe_key();

		if let Err(err) = shared.set(&key, key.as_bytes(), PROBE_TTL_SECONDS).await {
			return ComponentHealth::Down { error: err.to_string() };
		}

		let health = match shared.get(&key).await {
			Ok(Some(value)) if value == key.as_bytes() => ComponentHealth::Up,
			Ok(_) => ComponentHealth::Down { error: "Probe value did not round-trip.".to_string() },
			Err(err) => ComponentHealth::Down { error: err.to_string() },
		};

		if let Err(err) = shared.delete(&key).await {
			tracing::debug!(error = %err, "Health probe cleanup failed.");
		}

		health
	}
}

/// Distinct per call and per process, so concurrent probes never read or delete each other's entry.
fn probe_key() -> String {
	format!(
		"health:probe:{}:{}:{}",
		std::process::id(),
		OffsetDateTime::now_utc().unix_timestamp_nanos(),
		PROBE_SEQ.fetch_add(1, Ordering::Relaxed),
	)
}
