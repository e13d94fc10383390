use std::{
	collections::HashMap,
	io,
	sync::{
		Mutex,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};

use rix_service::{BoxFuture, SharedCache};
use rix_storage::Error;

/// Shared tier without expiry. Stored TTLs are kept for assertions.
#[derive(Default)]
pub struct MemoryShared {
	entries: Mutex<HashMap<String, (Vec<u8>, u64)>>,
	gets: AtomicUsize,
	sets: AtomicUsize,
	failing: AtomicBool,
}
impl MemoryShared {
	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}

	pub fn ttl_of(&self, key: &str) -> Option<u64> {
		self.lock().get(key).map(|(_, ttl)| *ttl)
	}

	pub fn get_count(&self) -> usize {
		self.gets.load(Ordering::SeqCst)
	}

	pub fn set_count(&self) -> usize {
		self.sets.load(Ordering::SeqCst)
	}

	/// Every call fails with a refused connection while set.
	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (Vec<u8>, u64)>> {
		self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	fn check(&self) -> rix_storage::Result<()> {
		if self.failing.load(Ordering::SeqCst) {
			return Err(Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused)));
		}

		Ok(())
	}
}

impl SharedCache for MemoryShared {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, rix_storage::Result<Option<Vec<u8>>>> {
		Box::pin(async move {
			self.gets.fetch_add(1, Ordering::SeqCst);
			self.check()?;

			Ok(self.lock().get(key).map(|(value, _)| value.clone()))
		})
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: &'a [u8],
		ttl_seconds: u64,
	) -> BoxFuture<'a, rix_storage::Result<()>> {
		Box::pin(async move {
			self.sets.fetch_add(1, Ordering::SeqCst);
			self.check()?;
			self.lock().insert(key.to_string(), (value.to_vec(), ttl_seconds));

			Ok(())
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, rix_storage::Result<bool>> {
		Box::pin(async move {
			self.check()?;

			Ok(self.lock().remove(key).is_some())
		})
	}
}
