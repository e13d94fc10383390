use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub index: Index,
	pub source: Source,
	pub broker: Broker,
	pub cache: Cache,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// Search engine core, e.g. `http://localhost:8983/solr/rooms`.
#[derive(Debug, Clone, Deserialize)]
pub struct Index {
	pub url: String,
	#[serde(default = "default_index_timeout_ms")]
	pub timeout_ms: u64,
}

/// Authoritative rooms service.
#[derive(Debug, Clone, Deserialize)]
pub struct Source {
	pub api_base: String,
	#[serde(default = "default_rooms_path")]
	pub rooms_path: String,
	#[serde(default = "default_source_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Broker {
	pub url: String,
	pub exchange: String,
	pub queue: String,
	pub routing_keys: Vec<String>,
	#[serde(default = "default_consumer_tag")]
	pub consumer_tag: String,
	#[serde(default = "default_prefetch")]
	pub prefetch: u16,
	#[serde(default = "default_connect_retries")]
	pub connect_retries: u32,
	#[serde(default = "default_retry_delay_ms")]
	pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cache {
	pub local: LocalCache,
	pub shared: SharedCache,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalCache {
	pub ttl_seconds: u64,
	/// Upper bound on the summed size of cached payloads.
	pub max_bytes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SharedCache {
	#[serde(default = "default_true")]
	pub enabled: bool,
	/// memcached `host:port`.
	pub addr: String,
	pub ttl_seconds: u64,
	#[serde(default = "default_shared_timeout_ms")]
	pub timeout_ms: u64,
	/// Open connections held toward the server; further callers wait within `timeout_ms`.
	#[serde(default = "default_shared_max_connections")]
	pub max_connections: usize,
	/// Largest value accepted from or sent to the server.
	#[serde(default = "default_shared_max_value_bytes")]
	pub max_value_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	#[serde(default = "default_limit")]
	pub default_limit: u32,
	#[serde(default = "default_max_limit")]
	pub max_limit: u32,
	#[serde(default = "default_search_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_max_suggestions")]
	pub max_suggestions: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_limit: default_limit(),
			max_limit: default_max_limit(),
			timeout_ms: default_search_timeout_ms(),
			max_suggestions: default_max_suggestions(),
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_index_timeout_ms() -> u64 {
	30_000
}

fn default_rooms_path() -> String {
	"/api/v1/rooms".to_string()
}

fn default_source_timeout_ms() -> u64 {
	5_000
}

fn default_consumer_tag() -> String {
	"search-api-consumer".to_string()
}

fn default_prefetch() -> u16 {
	1
}

fn default_connect_retries() -> u32 {
	10
}

fn default_retry_delay_ms() -> u64 {
	5_000
}

fn default_true() -> bool {
	true
}

fn default_shared_timeout_ms() -> u64 {
	2_000
}

fn default_shared_max_connections() -> usize {
	8
}

fn default_shared_max_value_bytes() -> usize {
	1024 * 1024
}

fn default_limit() -> u32 {
	10
}

fn default_max_limit() -> u32 {
	100
}

fn default_search_timeout_ms() -> u64 {
	10_000
}

fn default_max_suggestions() -> u32 {
	20
}
