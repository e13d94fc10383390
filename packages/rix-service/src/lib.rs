pub mod cache;
pub mod health;
pub mod indexing;
pub mod search;

mod error;

pub use cache::{CacheKind, TieredCache, cache_key};
pub use error::{Error, Result};
pub use health::{ComponentHealth, HealthReport, HealthStatus};
pub use indexing::{Outcome, SubjectLanes};

use std::{future::Future, pin::Pin, sync::Arc};

use rix_config::Config;
use rix_domain::{FacetCounts, IndexedRoom, QueryPage, RoomQuery};
use rix_providers::RoomsClient;
use rix_storage::{MemcachedCache, SolrStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait IndexStore
where
	Self: Send + Sync,
{
	fn upsert<'a>(&'a self, room: &'a IndexedRoom) -> BoxFuture<'a, rix_storage::Result<()>>;

	fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, rix_storage::Result<()>>;

	fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, rix_storage::Result<Option<IndexedRoom>>>;

	fn query<'a>(&'a self, query: &'a RoomQuery) -> BoxFuture<'a, rix_storage::Result<QueryPage>>;

	fn suggest<'a>(
		&'a self,
		prefix: &'a str,
		limit: usize,
	) -> BoxFuture<'a, rix_storage::Result<Vec<String>>>;

	fn facets(&self) -> BoxFuture<'_, rix_storage::Result<FacetCounts>>;

	fn ping(&self) -> BoxFuture<'_, rix_storage::Result<()>>;
}

pub trait RoomSource
where
	Self: Send + Sync,
{
	fn fetch_room<'a>(&'a self, room_id: &'a str)
	-> BoxFuture<'a, rix_providers::Result<IndexedRoom>>;
}

pub trait SharedCache
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, rix_storage::Result<Option<Vec<u8>>>>;

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: &'a [u8],
		ttl_seconds: u64,
	) -> BoxFuture<'a, rix_storage::Result<()>>;

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, rix_storage::Result<bool>>;
}

/// Read and write paths over one index, one source of truth and one tiered cache.
///
/// Both the HTTP surface and the broker consumer must share a single instance, otherwise
/// invalidation done by the consumer never reaches the local tier the queries read from.
pub struct RixService {
	pub cfg: Config,
	pub index: Arc<dyn IndexStore>,
	pub source: Arc<dyn RoomSource>,
	pub cache: TieredCache,
	lanes: SubjectLanes,
}
impl RixService {
	pub fn new(cfg: Config) -> Result<Self> {
		let index = Arc::new(SolrStore::new(&cfg.index)?);
		let source = Arc::new(RoomsClient::new(&cfg.source)?);
		let shared: Option<Arc<dyn SharedCache>> = if cfg.cache.shared.enabled {
			Some(Arc::new(MemcachedCache::new(&cfg.cache.shared)))
		} else {
			None
		};

		Ok(Self::with_parts(cfg, index, source, shared))
	}

	pub fn with_parts(
		cfg: Config,
		index: Arc<dyn IndexStore>,
		source: Arc<dyn RoomSource>,
		shared: Option<Arc<dyn SharedCache>>,
	) -> Self {
		let cache = TieredCache::new(&cfg.cache, shared);

		Self { cfg, index, source, cache, lanes: SubjectLanes::new(indexing::DEFAULT_LANES) }
	}
}

impl IndexStore for SolrStore {
	fn upsert<'a>(&'a self, room: &'a IndexedRoom) -> BoxFuture<'a, rix_storage::Result<()>> {
		Box::pin(SolrStore::upsert(self, room))
	}

	fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, rix_storage::Result<()>> {
		Box::pin(SolrStore::delete(self, id))
	}

	fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, rix_storage::Result<Option<IndexedRoom>>> {
		Box::pin(SolrStore::get(self, id))
	}

	fn query<'a>(&'a self, query: &'a RoomQuery) -> BoxFuture<'a, rix_storage::Result<QueryPage>> {
		Box::pin(SolrStore::query(self, query))
	}

	fn suggest<'a>(
		&'a self,
		prefix: &'a str,
		limit: usize,
	) -> BoxFuture<'a, rix_storage::Result<Vec<String>>> {
		Box::pin(SolrStore::suggest(self, prefix, limit))
	}

	fn facets(&self) -> BoxFuture<'_, rix_storage::Result<FacetCounts>> {
		Box::pin(SolrStore::facets(self))
	}

	fn ping(&self) -> BoxFuture<'_, rix_storage::Result<()>> {
		Box::pin(SolrStore::ping(self))
	}
}

impl RoomSource for RoomsClient {
	fn fetch_room<'a>(
		&'a self,
		room_id: &'a str,
	) -> BoxFuture<'a, rix_providers::Result<IndexedRoom>> {
		Box::pin(RoomsClient::fetch_room(self, room_id))
	}
}

impl SharedCache for MemcachedCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, rix_storage::Result<Option<Vec<u8>>>> {
		Box::pin(MemcachedCache::get(self, key))
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: &'a [u8],
		ttl_seconds: u64,
	) -> BoxFuture<'a, rix_storage::Result<()>> {
		Box::pin(MemcachedCache::set(self, key, value, ttl_seconds))
	}

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, rix_storage::Result<bool>> {
		Box::pin(MemcachedCache::delete(self, key))
	}
}
