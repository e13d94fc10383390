mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Broker, Cache, Config, Index, LocalCache, Search, Service, SharedCache, Source};

use std::{fs, path::Path};

/// Engine calls may take tens of seconds, never longer.
pub const MAX_INDEX_TIMEOUT_MS: u64 = 60_000;
/// Source-of-truth lookups must finish within single-digit seconds.
pub const MAX_SOURCE_TIMEOUT_MS: u64 = 9_999;
/// Hard ceiling for `search.max_limit`.
pub const MAX_PAGE_SIZE: u32 = 100;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("index.url", &cfg.index.url),
		("source.api_base", &cfg.source.api_base),
		("broker.url", &cfg.broker.url),
		("broker.exchange", &cfg.broker.exchange),
		("broker.queue", &cfg.broker.queue),
		("cache.shared.addr", &cfg.cache.shared.addr),
	] {
		if value.trim().is_empty() {
			return Err(Error::validation(format!("{label} must be non-empty.")));
		}
	}

	if !(1..=MAX_INDEX_TIMEOUT_MS).contains(&cfg.index.timeout_ms) {
		return Err(Error::validation(format!(
			"index.timeout_ms must be in the range 1-{MAX_INDEX_TIMEOUT_MS}."
		)));
	}
	if !(1..=MAX_SOURCE_TIMEOUT_MS).contains(&cfg.source.timeout_ms) {
		return Err(Error::validation(format!(
			"source.timeout_ms must be in the range 1-{MAX_SOURCE_TIMEOUT_MS}."
		)));
	}
	if !cfg.source.rooms_path.starts_with('/') {
		return Err(Error::validation("source.rooms_path must start with '/'."));
	}
	if cfg.broker.routing_keys.is_empty() {
		return Err(Error::validation("broker.routing_keys must be non-empty."));
	}
	if cfg.broker.routing_keys.iter().any(|key| key.trim().is_empty()) {
		return Err(Error::validation("broker.routing_keys must not contain blank keys."));
	}
	if cfg.broker.prefetch == 0 {
		return Err(Error::validation("broker.prefetch must be greater than zero."));
	}
	if cfg.broker.connect_retries == 0 {
		return Err(Error::validation("broker.connect_retries must be greater than zero."));
	}
	if cfg.cache.local.ttl_seconds == 0 {
		return Err(Error::validation("cache.local.ttl_seconds must be greater than zero."));
	}
	if cfg.cache.local.max_bytes == 0 {
		return Err(Error::validation("cache.local.max_bytes must be greater than zero."));
	}
	if cfg.cache.shared.ttl_seconds == 0 {
		return Err(Error::validation("cache.shared.ttl_seconds must be greater than zero."));
	}
	if cfg.cache.shared.ttl_seconds < cfg.cache.local.ttl_seconds {
		return Err(Error::validation(
			"cache.shared.ttl_seconds must be greater than or equal to cache.local.ttl_seconds.",
		));
	}
	if cfg.cache.shared.timeout_ms == 0 {
		return Err(Error::validation("cache.shared.timeout_ms must be greater than zero."));
	}
	if cfg.cache.shared.max_connections == 0 {
		return Err(Error::validation("cache.shared.max_connections must be greater than zero."));
	}
	if cfg.cache.shared.max_value_bytes == 0 {
		return Err(Error::validation("cache.shared.max_value_bytes must be greater than zero."));
	}
	if cfg.search.max_limit == 0 || cfg.search.max_limit > MAX_PAGE_SIZE {
		return Err(Error::validation(format!(
			"search.max_limit must be in the range 1-{MAX_PAGE_SIZE}."
		)));
	}
	if cfg.search.default_limit == 0 || cfg.search.default_limit > cfg.search.max_limit {
		return Err(Error::validation(
			"search.default_limit must be in the range 1-search.max_limit.",
		));
	}
	if cfg.search.timeout_ms == 0 {
		return Err(Error::validation("search.timeout_ms must be greater than zero."));
	}
	if cfg.search.max_suggestions == 0 {
		return Err(Error::validation("search.max_suggestions must be greater than zero."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for url in [&mut cfg.index.url, &mut cfg.source.api_base] {
		let trimmed = url.trim().trim_end_matches('/').to_string();

		*url = trimmed;
	}

	let path = cfg.source.rooms_path.trim().trim_end_matches('/').to_string();

	cfg.source.rooms_path = path;
	cfg.broker.routing_keys.retain(|key| !key.trim().is_empty());
	cfg.broker.routing_keys.iter_mut().for_each(|key| *key = key.trim().to_string());
}
