use std::{env, fs, path::PathBuf};

use lore_domain::{Filter, MetadataValue};
use lore_storage::{Error, snapshot::SnapshotStore};

fn fixture_path() -> PathBuf {
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/snapshot.json")
}

#[test]
fn opens_snapshot_fixture() {
	let cfg = lore_config::Snapshot { path: fixture_path() };
	let store = SnapshotStore::open(&cfg, 3).expect("Fixture snapshot must load.");

	assert_eq!(store.len(), 2);
}

#[test]
fn rejects_snapshot_with_other_dimension() {
	let cfg = lore_config::Snapshot { path: fixture_path() };
	let err = SnapshotStore::open(&cfg, 384).expect_err("Expected dimension error.");

	assert!(matches!(err, Error::InvalidSnapshot(_)));
}

#[test]
fn padded_extension_filter_selects_documents() {
	let store = SnapshotStore::load(&fixture_path()).expect("Fixture snapshot must load.");
	let filter = Filter::contains_substring("extensions_csv_padded", ",quarkus-arc,");
	let hits = store.search(&[0.5, 0.5, 0.0], Some(&filter), 10, 0.0).expect("search");

	assert_eq!(hits.len(), 1);
	assert_eq!(hits[0].id, "quarkus-lifecycle-0");
	assert_eq!(hits[0].metadata["chunk"], MetadataValue::Integer(0));
}

#[test]
fn malformed_snapshot_is_parse_error() {
	let path = env::temp_dir().join(format!("lore_snapshot_bad_{}.json", std::process::id()));

	fs::write(&path, "{ \"documents\": [ { \"id\": 1 } ] }").expect("Failed to write snapshot.");

	let err = SnapshotStore::load(&path).expect_err("Expected parse error.");

	fs::remove_file(&path).expect("Failed to remove snapshot.");

	assert!(matches!(err, Error::ParseSnapshot { .. }));
}

#[test]
fn missing_snapshot_is_read_error() {
	let path = env::temp_dir().join("lore_snapshot_missing.json");
	let err = SnapshotStore::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadSnapshot { .. }));
}
