use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use rix_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(section: &[&str], key: &str, value: Value) -> String {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let mut table = root.as_table_mut().expect("Template config must be a table.");

	for name in section {
		table = table
			.get_mut(*name)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{name}]."));
	}

	table.insert(key.to_string(), value);

	toml::to_string(&root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("rix_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> rix_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = rix_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(payload: String, needle: &str) {
	let err = load_payload(payload).expect_err("Expected validation error.");

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error kind: {err:?}");

	let message = err.to_string();

	assert!(message.contains(needle), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads_and_normalizes_urls() {
	let cfg = load_payload(SAMPLE_CONFIG_TEMPLATE_TOML.to_string())
		.expect("Sample config should load.");

	assert_eq!(cfg.index.url, "http://localhost:8983/solr/rooms");
	assert_eq!(cfg.source.rooms_path, "/api/v1/rooms");
	assert_eq!(cfg.broker.routing_keys.len(), 6);
	assert_eq!(cfg.search.max_limit, 100);
	assert!(cfg.cache.shared.enabled);
	assert_eq!(cfg.cache.shared.max_connections, 8);
	assert_eq!(cfg.cache.shared.max_value_bytes, 1024 * 1024);
}

#[test]
fn search_section_defaults_when_absent() {
	let mut root: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");

	root.as_table_mut().expect("Template config must be a table.").remove("search");

	let cfg = load_payload(toml::to_string(&root).expect("Failed to render config."))
		.expect("Config without [search] should load.");

	assert_eq!(cfg.search.default_limit, 10);
	assert_eq!(cfg.search.max_limit, 100);
	assert_eq!(cfg.search.max_suggestions, 20);
}

#[test]
fn index_timeout_is_capped() {
	expect_validation(
		sample_toml_with(&["index"], "timeout_ms", Value::Integer(120_000)),
		"index.timeout_ms must be in the range",
	);
}

#[test]
fn source_timeout_stays_in_single_digit_seconds() {
	expect_validation(
		sample_toml_with(&["source"], "timeout_ms", Value::Integer(10_000)),
		"source.timeout_ms must be in the range",
	);
}

#[test]
fn shared_ttl_must_cover_local_ttl() {
	expect_validation(
		sample_toml_with(&["cache", "shared"], "ttl_seconds", Value::Integer(30)),
		"cache.shared.ttl_seconds must be greater than or equal to cache.local.ttl_seconds.",
	);
}

#[test]
fn shared_pool_needs_at_least_one_connection() {
	expect_validation(
		sample_toml_with(&["cache", "shared"], "max_connections", Value::Integer(0)),
		"cache.shared.max_connections must be greater than zero.",
	);
}

#[test]
fn max_limit_cannot_exceed_page_ceiling() {
	expect_validation(
		sample_toml_with(&["search"], "max_limit", Value::Integer(500)),
		"search.max_limit must be in the range 1-100.",
	);
}

#[test]
fn routing_keys_must_be_non_empty() {
	expect_validation(
		sample_toml_with(&["broker"], "routing_keys", Value::Array(Vec::new())),
		"broker.routing_keys must be non-empty.",
	);
}

#[test]
fn prefetch_must_be_positive() {
	expect_validation(
		sample_toml_with(&["broker"], "prefetch", Value::Integer(0)),
		"broker.prefetch must be greater than zero.",
	);
}

#[test]
fn missing_file_reports_read_error() {
	let err = rix_config::load(&PathBuf::from("/nonexistent/rix.toml"))
		.expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}
