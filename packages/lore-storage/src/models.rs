use serde::{Deserialize, Serialize};

use lore_domain::Metadata;

/// Raw nearest-neighbour hit as returned by a backend, before it becomes a `Match`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHit {
	pub id: String,
	pub text: String,
	pub score: f32,
	pub metadata: Metadata,
}

/// One indexed snippet in a snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
	pub id: String,
	pub text: String,
	pub vector: Vec<f32>,
	#[serde(default)]
	pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
	pub documents: Vec<SnapshotDocument>,
}
