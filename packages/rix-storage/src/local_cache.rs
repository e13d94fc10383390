// std
use std::{sync::Arc, time::Duration};

// crates.io
use moka::future::Cache;

/// In-process tier, bounded by total payload bytes with a fixed time-to-live.
///
/// Reads, writes and [`LocalCache::invalidate_all`] may race freely; a racing reader sees
/// either the old or the new entry.
#[derive(Clone)]
pub struct LocalCache {
	cache: Cache<String, Arc<Vec<u8>>>,
}
impl LocalCache {
	pub fn new(cfg: &rix_config::LocalCache) -> Self {
		let cache = Cache::builder()
			.max_capacity(cfg.max_bytes)
			.weigher(|key: &String, value: &Arc<Vec<u8>>| {
				u32::try_from(key.len() + value.len()).unwrap_or(u32::MAX)
			})
			.time_to_live(Duration::from_secs(cfg.ttl_seconds))
			.build();

		Self { cache }
	}

	pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
		self.cache.get(key).await
	}

	pub async fn insert(&self, key: String, value: Arc<Vec<u8>>) {
		self.cache.insert(key, value).await;
	}

	pub async fn invalidate(&self, key: &str) {
		self.cache.invalidate(key).await;
	}

	pub fn invalidate_all(&self) {
		self.cache.invalidate_all();
	}

	/// Flushes pending maintenance so counts and evictions are observable.
	pub async fn sync(&self) {
		self.cache.run_pending_tasks().await;
	}

	pub fn entry_count(&self) -> u64 {
		self.cache.entry_count()
	}
}
