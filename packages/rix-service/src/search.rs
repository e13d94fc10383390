// std
use std::{future::Future, time::Duration};

// crates.io
use serde::{Serialize, de::DeserializeOwned};

// self
use crate::{CacheKind, Error, Result, RixService, cache_key};
use rix_domain::{
	FacetCounts, RoomQuery, RoomSearchRequest, RoomStatus, RoomType, SearchResponse, SortOrder,
	SuggestionResponse,
};

const DEFAULT_SUGGESTIONS: u32 = 10;

#[derive(Serialize)]
struct SuggestKey<'a> {
	prefix: &'a str,
	limit: u32,
}

impl RixService {
	pub async fn search(&self, req: RoomSearchRequest) -> Result<SearchResponse> {
		let query = normalize_request(&self.cfg.search, req)?;
		let key = cache_key(CacheKind::Search, &query)?;

		if let Some(hit) = self.cached::<SearchResponse>(&key).await {
			return Ok(hit);
		}

		let epoch = self.cache.epoch();
		let page = self.with_deadline("Room search", self.index.query(&query)).await?;
		let response = SearchResponse {
			page: query.page,
			limit: query.limit,
			total: page.total,
			results: page.docs.into_iter().take(query.limit as usize).collect(),
		};

		self.store(&key, &response, epoch).await;

		Ok(response)
	}

	pub async fn suggestions(&self, prefix: &str, limit: Option<i64>) -> Result<SuggestionResponse> {
		let prefix = prefix.trim();

		if prefix.is_empty() {
			return Err(Error::invalid("Suggestion prefix must not be empty."));
		}

		let limit = suggestion_limit(self.cfg.search.max_suggestions, limit)?;
		let key = cache_key(CacheKind::Suggest, &SuggestKey { prefix, limit })?;

		if let Some(hit) = self.cached::<SuggestionResponse>(&key).await {
			return Ok(hit);
		}

		let epoch = self.cache.epoch();
		let suggestions =
			self.with_deadline("Room suggestions", self.index.suggest(prefix, limit as usize)).await?;
		let response = SuggestionResponse { suggestions };

		self.store(&key, &response, epoch).await;

		Ok(response)
	}

	pub async fn facets(&self) -> Result<FacetCounts> {
		let key = cache_key(CacheKind::Facets, &())?;

		if let Some(hit) = self.cached::<FacetCounts>(&key).await {
			return Ok(hit);
		}

		let epoch = self.cache.epoch();
		let facets = self.with_deadline("Room facets", self.index.facets()).await?;

		self.store(&key, &facets, epoch).await;

		Ok(facets)
	}

	/// Engine calls are cancelled once the search deadline passes.
	async fn with_deadline<T, F>(&self, operation: &str, call: F) -> Result<T>
	where
		F: Future<Output = rix_storage::Result<T>>,
	{
		let deadline = Duration::from_millis(self.cfg.search.timeout_ms);

		match tokio::time::timeout(deadline, call).await {
			Ok(Ok(value)) => Ok(value),
			Ok(Err(err)) => {
				tracing::error!(error = %err, operation, "Index engine call failed.");

				Err(err.into())
			},
			Err(_) => {
				tracing::error!(operation, timeout_ms = self.cfg.search.timeout_ms, "Index engine call timed out.");

				Err(Error::Timeout {
					message: format!(
						"{operation} exceeded {} ms.",
						self.cfg.search.timeout_ms
					),
				})
			},
		}
	}

	async fn cached<T>(&self, key: &str) -> Option<T>
	where
		T: DeserializeOwned,
	{
		let raw = self.cache.get(key).await?;

		match serde_json::from_slice(&raw) {
			Ok(value) => Some(value),
			Err(err) => {
				tracing::warn!(error = %err, cache_key = key, "Cache payload decode failed.");

				None
			},
		}
	}

	async fn store<T>(&self, key: &str, value: &T, epoch: u64)
	where
		T: Serialize,
	{
		match serde_json::to_vec(value) {
			Ok(raw) => self.cache.set(key, raw, epoch).await,
			Err(err) => {
				tracing::warn!(error = %err, cache_key = key, "Cache payload encode failed.");
			},
		}
	}
}

/// Validates `req` and fills defaults, producing the canonical query used for both the engine
/// call and the cache key.
pub fn normalize_request(cfg: &rix_config::Search, req: RoomSearchRequest) -> Result<RoomQuery> {
	let page = match req.page {
		Some(page) if page < 0 => return Err(Error::invalid("page must not be negative.")),
		Some(0) | None => 1,
		Some(page) => u32::try_from(page)
			.map_err(|_| Error::invalid(format!("page must be at most {}.", u32::MAX)))?,
	};
	let limit = match req.limit {
		Some(limit) if limit < 0 => return Err(Error::invalid("limit must not be negative.")),
		Some(limit) if limit > i64::from(cfg.max_limit) =>
			return Err(Error::invalid(format!("limit must be at most {}.", cfg.max_limit))),
		Some(0) | None => cfg.default_limit,
		Some(limit) => limit as u32,
	};

	for (name, price) in [("min_price", req.min_price), ("max_price", req.max_price)] {
		if let Some(price) = price
			&& (!price.is_finite() || price < 0.0)
		{
			return Err(Error::invalid(format!("{name} must be a non-negative number.")));
		}
	}

	if let (Some(min), Some(max)) = (req.min_price, req.max_price)
		&& min > max
	{
		return Err(Error::invalid("min_price must not exceed max_price."));
	}

	Ok(RoomQuery {
		text: req.q.map(|text| text.trim().to_string()).filter(|text| !text.is_empty()),
		room_type: req.room_type.filter(|kind| *kind != RoomType::Unspecified),
		status: req.status.filter(|status| *status != RoomStatus::Unspecified),
		floor: req.floor,
		min_price: req.min_price,
		max_price: req.max_price,
		has_wifi: req.has_wifi,
		has_ac: req.has_ac,
		has_tv: req.has_tv,
		has_minibar: req.has_minibar,
		sort: req.sort.as_deref().map(SortOrder::parse).unwrap_or_default(),
		page,
		limit,
	})
}

fn suggestion_limit(max: u32, requested: Option<i64>) -> Result<u32> {
	match requested {
		Some(limit) if limit < 0 => Err(Error::invalid("limit must not be negative.")),
		Some(0) | None => Ok(DEFAULT_SUGGESTIONS.min(max)),
		Some(limit) => Ok(u32::try_from(limit).unwrap_or(u32::MAX).min(max)),
	}
}
