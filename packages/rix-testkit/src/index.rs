use std::{
	collections::BTreeMap,
	sync::{
		Mutex, MutexGuard,
		atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
	},
	time::Duration,
};

use rix_domain::{FacetCounts, IndexedRoom, QueryPage, RoomQuery, SortOrder};
use rix_service::{BoxFuture, IndexStore};
use rix_storage::Error;

/// Replace-on-upsert document map with engine-like filtering, sorting and paging.
#[derive(Default)]
pub struct MemoryIndex {
	docs: Mutex<BTreeMap<String, IndexedRoom>>,
	queries: Mutex<Vec<RoomQuery>>,
	upserts: AtomicUsize,
	deletes: AtomicUsize,
	suggests: AtomicUsize,
	facet_calls: AtomicUsize,
	failing: AtomicBool,
	query_delay_ms: AtomicU64,
	get_delay_ms: AtomicU64,
	gets_in_flight: AtomicUsize,
	max_gets_in_flight: AtomicUsize,
}
impl MemoryIndex {
	pub fn seed(&self, room: IndexedRoom) {
		lock(&self.docs).insert(room.id.clone(), room);
	}

	pub fn doc(&self, id: &str) -> Option<IndexedRoom> {
		lock(&self.docs).get(id).cloned()
	}

	pub fn doc_count(&self) -> usize {
		lock(&self.docs).len()
	}

	pub fn query_count(&self) -> usize {
		lock(&self.queries).len()
	}

	pub fn last_query(&self) -> Option<RoomQuery> {
		lock(&self.queries).last().cloned()
	}

	pub fn upsert_count(&self) -> usize {
		self.upserts.load(Ordering::SeqCst)
	}

	pub fn delete_count(&self) -> usize {
		self.deletes.load(Ordering::SeqCst)
	}

	pub fn suggest_count(&self) -> usize {
		self.suggests.load(Ordering::SeqCst)
	}

	pub fn facet_count(&self) -> usize {
		self.facet_calls.load(Ordering::SeqCst)
	}

	/// Every call fails with a 503 while set.
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn set_query_delay(&self, delay: Duration) {
		self.query_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
	}

	pub fn set_get_delay(&self, delay: Duration) {
		self.get_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
	}

	/// Highest number of `get` calls observed running at once.
	pub fn max_concurrent_gets(&self) -> usize {
		self.max_gets_in_flight.load(Ordering::SeqCst)
	}

	fn check(&self) -> rix_storage::Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(Error::Engine { status: 503, body: "engine unavailable".to_string() });
		}

		Ok(())
	}

	fn run_query(&self, query: &RoomQuery) -> QueryPage {
		let mut hits: Vec<IndexedRoom> =
			lock(&self.docs).values().filter(|room| matches(room, query)).cloned().collect();

		hits.sort_by(|a, b| {
			let order = match query.sort {
				SortOrder::PriceAsc => a.price.total_cmp(&b.price),
				SortOrder::PriceDesc => b.price.total_cmp(&a.price),
				SortOrder::CapacityAsc => a.capacity.cmp(&b.capacity),
				SortOrder::CapacityDesc => b.capacity.cmp(&a.capacity),
				SortOrder::Default => a.number.cmp(&b.number),
			};

			order.then_with(|| a.id.cmp(&b.id))
		});

		let total = hits.len() as u64;
		let docs =
			hits.into_iter().skip(query.start() as usize).take(query.limit as usize).collect();

		QueryPage { docs, total }
	}
}

impl IndexStore for MemoryIndex {
	fn upsert<'a>(&'a self, room: &'a IndexedRoom) -> BoxFuture<'a, rix_storage::Result<()>> {
		Box::pin(async move {
			self.check()?;
			self.upserts.fetch_add(1, Ordering::SeqCst);
			lock(&self.docs).insert(room.id.clone(), room.clone());

			Ok(())
		})
	}

	fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, rix_storage::Result<()>> {
		Box::pin(async move {
			self.check()?;
			self.deletes.fetch_add(1, Ordering::SeqCst);
			lock(&self.docs).remove(id);

			Ok(())
		})
	}

	fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, rix_storage::Result<Option<IndexedRoom>>> {
		Box::pin(async move {
			let in_flight = self.gets_in_flight.fetch_add(1, Ordering::SeqCst) + 1;

			self.max_gets_in_flight.fetch_max(in_flight, Ordering::SeqCst);

			let delay = self.get_delay_ms.load(Ordering::SeqCst);

			if delay > 0 {
				tokio::time::sleep(Duration::from_millis(delay)).await;
			}

			let doc = self.doc(id);

			self.gets_in_flight.fetch_sub(1, Ordering::SeqCst);
			self.check()?;

			Ok(doc)
		})
	}

	fn query<'a>(&'a self, query: &'a RoomQuery) -> BoxFuture<'a, rix_storage::Result<QueryPage>> {
		Box::pin(async move {
			lock(&self.queries).push(query.clone());

			let delay = self.query_delay_ms.load(Ordering::SeqCst);

			if delay > 0 {
				tokio::time::sleep(Duration::from_millis(delay)).await;
			}

			self.check()?;

			Ok(self.run_query(query))
		})
	}

	fn suggest<'a>(
		&'a self,
		prefix: &'a str,
		limit: usize,
	) -> BoxFuture<'a, rix_storage::Result<Vec<String>>> {
		Box::pin(async move {
			self.suggests.fetch_add(1, Ordering::SeqCst);
			self.check()?;

			let needle = prefix.to_lowercase();
			let mut out: Vec<String> = Vec::new();

			for room in lock(&self.docs).values() {
				for candidate in [room.number.as_str(), room.room_type.as_str()] {
					if !candidate.is_empty()
						&& candidate.to_lowercase().starts_with(&needle)
						&& !out.iter().any(|seen| seen == candidate)
					{
						out.push(candidate.to_string());
					}
				}
			}

			out.truncate(limit);

			Ok(out)
		})
	}

	fn facets(&self) -> BoxFuture<'_, rix_storage::Result<FacetCounts>> {
		Box::pin(async move {
			self.facet_calls.fetch_add(1, Ordering::SeqCst);
			self.check()?;

			let mut facets = FacetCounts::default();

			for room in lock(&self.docs).values() {
				*facets.room_types.entry(room.room_type.as_str().to_string()).or_default() += 1;
				*facets.status_counts.entry(room.status.as_str().to_string()).or_default() += 1;
				*facets.floor_counts.entry(room.floor).or_default() += 1;

				let amenities = [
					("has_wifi", room.has_wifi),
					("has_ac", room.has_ac),
					("has_tv", room.has_tv),
					("has_minibar", room.has_minibar),
				];

				for (field, present) in amenities {
					if present {
						*facets.amenity_counts.entry(field.to_string()).or_default() += 1;
					}
				}
			}

			Ok(facets)
		})
	}

	fn ping(&self) -> BoxFuture<'_, rix_storage::Result<()>> {
		Box::pin(async move { self.check() })
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn matches(room: &IndexedRoom, query: &RoomQuery) -> bool {
	if let Some(text) = query.text.as_deref() {
		let needle = text.to_lowercase();
		let haystacks = [room.number.as_str(), room.room_type.as_str(), room.description.as_str()];

		if !haystacks.iter().any(|field| field.to_lowercase().contains(&needle)) {
			return false;
		}
	}

	let amenities = [
		(query.has_wifi, room.has_wifi),
		(query.has_ac, room.has_ac),
		(query.has_tv, room.has_tv),
		(query.has_minibar, room.has_minibar),
	];

	query.room_type.is_none_or(|kind| kind == room.room_type)
		&& query.status.is_none_or(|status| status == room.status)
		&& query.floor.is_none_or(|floor| floor == room.floor)
		&& query.min_price.is_none_or(|min| room.price >= min)
		&& query.max_price.is_none_or(|max| room.price <= max)
		&& amenities.iter().all(|(wanted, actual)| wanted.is_none_or(|wanted| wanted == *actual))
}
