use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use lore_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn table_mut<'a>(value: &'a mut Value, path: &[&str]) -> &'a mut toml::Table {
	let mut current = value.as_table_mut().expect("Config must be a table.");

	for key in path {
		current = current
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{key}]."));
	}

	current
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

	path.push(format!("lore_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_value(value: Value) -> lore_config::Result<Config> {
	let path = write_temp_config(toml::to_string(&value).expect("Failed to render config."));
	let result = lore_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(value: Value, needle: &str) {
	let err = load_value(value).expect_err("Expected validation error.");

	match err {
		Error::Validation { message } => {
			assert!(message.contains(needle), "unexpected message: {message}");
		},
		other => panic!("Expected validation error, got {other:?}."),
	}
}

#[test]
fn loads_sample_config() {
	let cfg = load_value(sample_value()).expect("Sample config must load.");

	assert_eq!(cfg.rag.max_results, 4);
	assert_eq!(cfg.rag.overfetch.multiplier, 5);
	assert_eq!(cfg.rag.overfetch.floor, 50);
	assert_eq!(cfg.rag.snippet_max_chars, 1_400);
	assert!(cfg.rag.augment_boost);
	assert_eq!(cfg.storage.qdrant.as_ref().map(|q| q.vector_dim), Some(384));
}

#[test]
fn trims_default_libraries() {
	let cfg = load_value(sample_value()).expect("Sample config must load.");

	assert_eq!(cfg.rag.libraries.as_deref(), Some("quarkus"));
}

#[test]
fn blank_libraries_become_absent() {
	let mut value = sample_value();

	table_mut(&mut value, &["rag"]).insert("libraries".to_string(), Value::from("   "));

	let cfg = load_value(value).expect("Config must load.");

	assert!(cfg.rag.libraries.is_none());
}

#[test]
fn overfetch_defaults_apply_when_section_missing() {
	let mut value = sample_value();

	table_mut(&mut value, &["rag"]).remove("overfetch");

	let cfg = load_value(value).expect("Config must load.");

	assert_eq!(cfg.rag.overfetch.multiplier, 5);
	assert_eq!(cfg.rag.overfetch.floor, 50);
}

#[test]
fn storage_may_be_empty() {
	let mut value = sample_value();

	table_mut(&mut value, &["storage"]).remove("qdrant");

	let cfg = load_value(value).expect("Config without storage must load.");

	assert!(cfg.storage.qdrant.is_none());
	assert!(cfg.storage.snapshot.is_none());
}

#[test]
fn rejects_zero_dimensions() {
	let mut value = sample_value();

	table_mut(&mut value, &["providers", "embedding"])
		.insert("dimensions".to_string(), Value::Integer(0));

	expect_validation(value, "providers.embedding.dimensions");
}

#[test]
fn rejects_dimension_mismatch() {
	let mut value = sample_value();

	table_mut(&mut value, &["storage", "qdrant"])
		.insert("vector_dim".to_string(), Value::Integer(768));

	expect_validation(value, "storage.qdrant.vector_dim");
}

#[test]
fn rejects_both_backends() {
	let mut value = sample_value();
	let mut snapshot = toml::Table::new();

	snapshot.insert("path".to_string(), Value::from("docs.json"));
	table_mut(&mut value, &["storage"]).insert("snapshot".to_string(), Value::Table(snapshot));

	expect_validation(value, "mutually exclusive");
}

#[test]
fn rejects_zero_max_results() {
	let mut value = sample_value();

	table_mut(&mut value, &["rag"]).insert("max_results".to_string(), Value::Integer(0));

	expect_validation(value, "rag.max_results");
}

#[test]
fn rejects_non_finite_min_score() {
	let mut value = sample_value();

	table_mut(&mut value, &["rag"]).insert("min_score".to_string(), Value::Float(f64::NAN));

	expect_validation(value, "rag.min_score");
}

#[test]
fn rejects_zero_overfetch_multiplier() {
	let mut value = sample_value();

	table_mut(&mut value, &["rag", "overfetch"])
		.insert("multiplier".to_string(), Value::Integer(0));

	expect_validation(value, "rag.overfetch.multiplier");
}

#[test]
fn rejects_blank_api_key() {
	let mut value = sample_value();

	table_mut(&mut value, &["providers", "embedding"])
		.insert("api_key".to_string(), Value::from(" "));

	expect_validation(value, "api_key");
}

#[test]
fn missing_file_is_read_error() {
	let path = env::temp_dir().join("lore_config_test_missing.toml");
	let err = lore_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }));
}
