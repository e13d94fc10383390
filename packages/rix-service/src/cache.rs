// std
use std::sync::{
	Arc,
	atomic::{AtomicU64, Ordering},
};

// crates.io
use serde::Serialize;

// self
use crate::{Error, Result, SharedCache};
use rix_storage::LocalCache;

const CACHE_SCHEMA_VERSION: u32 = 1;
const KEY_DIGEST_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
	Search,
	Suggest,
	Facets,
}
impl CacheKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Search => "search",
			Self::Suggest => "suggest",
			Self::Facets => "facets",
		}
	}
}

#[derive(Serialize)]
struct KeyPayload<'a, T> {
	schema_version: u32,
	kind: &'static str,
	params: &'a T,
}

/// `<namespace>:<digest>` over the canonical serde form of `params`.
///
/// `params` must serialize every optional field in a fixed order; that is what makes two
/// equivalent requests collide regardless of how they were presented.
pub fn cache_key<T>(kind: CacheKind, params: &T) -> Result<String>
where
	T: Serialize,
{
	let payload = KeyPayload { schema_version: CACHE_SCHEMA_VERSION, kind: kind.as_str(), params };
	let raw = serde_json::to_vec(&payload).map_err(|err| Error::Decode {
		message: format!("Failed to encode cache key payload: {err}"),
	})?;
	let digest = blake3::hash(&raw).to_hex();

	Ok(format!("{}:{}", kind.as_str(), &digest[..KEY_DIGEST_LEN]))
}

/// Local tier in front of an optional shared tier.
///
/// Shared tier failures degrade to misses and are never returned to callers.
pub struct TieredCache {
	local: LocalCache,
	shared: Option<Arc<dyn SharedCache>>,
	shared_ttl_seconds: u64,
	epoch: AtomicU64,
}
impl TieredCache {
	pub fn new(cfg: &rix_config::Cache, shared: Option<Arc<dyn SharedCache>>) -> Self {
		Self {
			local: LocalCache::new(&cfg.local),
			shared,
			shared_ttl_seconds: cfg.shared.ttl_seconds,
			epoch: AtomicU64::new(0),
		}
	}

	pub fn local(&self) -> &LocalCache {
		&self.local
	}

	pub fn shared(&self) -> Option<&Arc<dyn SharedCache>> {
		self.shared.as_ref()
	}

	/// Bumped by every [`TieredCache::invalidate_all`]. Readers capture it before computing a
	/// value and pass it back to [`TieredCache::set`].
	pub fn epoch(&self) -> u64 {
		self.epoch.load(Ordering::Acquire)
	}

	pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
		if let Some(value) = self.local.get(key).await {
			tracing::debug!(cache_key = key, tier = "local", hit = true, "Cache hit.");

			return Some(value);
		}

		let Some(shared) = self.shared.as_ref() else {
			tracing::debug!(cache_key = key, tier = "local", hit = false, "Cache miss.");

			return None;
		};

		match shared.get(key).await {
			Ok(Some(bytes)) => {
				tracing::debug!(cache_key = key, tier = "shared", hit = true, "Cache hit.");

				let value = Arc::new(bytes);

				self.local.insert(key.to_string(), Arc::clone(&value)).await;

				Some(value)
			},
			Ok(None) => {
				tracing::debug!(cache_key = key, tier = "shared", hit = false, "Cache miss.");

				None
			},
			Err(err) => {
				tracing::warn!(error = %err, cache_key = key, tier = "shared", "Cache read failed.");

				None
			},
		}
	}

	/// Writes the shared tier, then the local tier.
	///
	/// The local write is dropped when an invalidation happened after `epoch` was observed. An
	/// invalidation landing between the check and the insert is caught by the second check, so
	/// a result computed before a mutation cannot outlive the clear in this process.
	pub async fn set(&self, key: &str, value: Vec<u8>, epoch: u64) {
		if let Some(shared) = self.shared.as_ref()
			&& let Err(err) = shared.set(key, &value, self.shared_ttl_seconds).await
		{
			tracing::warn!(error = %err, cache_key = key, tier = "shared", "Cache write failed.");
		}

		if self.epoch() != epoch {
			tracing::debug!(cache_key = key, tier = "local", "Cache write skipped after invalidation.");

			return;
		}

		self.local.insert(key.to_string(), Arc::new(value)).await;

		if self.epoch() != epoch {
			self.local.invalidate(key).await;
			tracing::debug!(cache_key = key, tier = "local", "Cache write withdrawn after invalidation.");
		}
	}

	/// Clears the local tier. Shared entries expire by TTL.
	pub fn invalidate_all(&self) {
		self.epoch.fetch_add(1, Ordering::AcqRel);
		self.local.invalidate_all();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rix_domain::{RoomQuery, RoomType};

	#[test]
	fn equivalent_queries_share_a_key() {
		let a = RoomQuery {
			room_type: Some(RoomType::Suite),
			min_price: Some(100.0),
			page: 1,
			limit: 10,
			..Default::default()
		};
		let b = RoomQuery { min_price: Some(100.0), ..a.clone() };

		assert_eq!(cache_key(CacheKind::Search, &a).ok(), cache_key(CacheKind::Search, &b).ok());
	}

	fn tiered() -> TieredCache {
		let cfg = rix_config::Cache {
			local: rix_config::LocalCache { ttl_seconds: 60, max_bytes: 1024 * 1024 },
			shared: rix_config::SharedCache {
				enabled: false,
				addr: "127.0.0.1:11211".to_string(),
				ttl_seconds: 300,
				timeout_ms: 200,
				max_connections: 1,
				max_value_bytes: 1024,
			},
		};

		TieredCache::new(&cfg, None)
	}

	#[tokio::test]
	async fn write_computed_before_invalidation_stays_out_of_local_tier() {
		let cache = tiered();
		let epoch = cache.epoch();

		cache.invalidate_all();
		cache.set("search:stale", b"old".to_vec(), epoch).await;

		assert!(cache.get("search:stale").await.is_none());

		let epoch = cache.epoch();

		cache.set("search:fresh", b"new".to_vec(), epoch).await;

		assert_eq!(cache.get("search:fresh").await.as_deref(), Some(&b"new".to_vec()));
	}

	#[test]
	fn keys_differ_by_value_and_namespace() {
		let a = RoomQuery { page: 1, limit: 10, ..Default::default() };
		let b = RoomQuery { page: 2, ..a.clone() };
		let key_a = cache_key(CacheKind::Search, &a).expect("key failed");

		assert_ne!(Some(key_a.clone()), cache_key(CacheKind::Search, &b).ok());
		assert_ne!(Some(key_a.clone()), cache_key(CacheKind::Suggest, &a).ok());
		assert!(key_a.starts_with("search:"));
		assert_eq!(key_a.len(), "search:".len() + KEY_DIGEST_LEN);
	}
}
