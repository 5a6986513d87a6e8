use std::{cmp::Ordering, fs, path::Path};

use crate::{
	Error, Result,
	models::{SnapshotDocument, SnapshotFile, StoreHit},
};
use lore_domain::Filter;

/// In-memory store over a JSON snapshot of an indexed collection.
///
/// Scores are raw cosine similarities, so they line up with a Qdrant collection
/// configured with the cosine distance.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
	documents: Vec<SnapshotDocument>,
}
impl SnapshotStore {
	pub fn open(cfg: &lore_config::Snapshot, vector_dim: u32) -> Result<Self> {
		let store = Self::load(&cfg.path)?;

		store.check_dimensions(vector_dim)?;

		tracing::info!(
			path = %cfg.path.display(),
			documents = store.documents.len(),
			"Snapshot store loaded."
		);

		Ok(store)
	}

	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::ReadSnapshot { path: path.to_path_buf(), source: err })?;
		let file: SnapshotFile = serde_json::from_str(&raw)
			.map_err(|err| Error::ParseSnapshot { path: path.to_path_buf(), source: err })?;

		Ok(Self::from_documents(file.documents))
	}

	pub fn from_documents(documents: Vec<SnapshotDocument>) -> Self {
		Self { documents }
	}

	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}

	/// Exhaustive cosine search. Equal scores keep snapshot order.
	pub fn search(
		&self,
		vector: &[f32],
		filter: Option<&Filter>,
		k: u32,
		min_score: f32,
	) -> Result<Vec<StoreHit>> {
		let mut hits = Vec::new();

		for doc in &self.documents {
			if filter.is_some_and(|filter| !filter.matches(&doc.metadata)) {
				continue;
			}
			if doc.vector.len() != vector.len() {
				return Err(Error::InvalidSnapshot(format!(
					"Document {} has {} dimensions, query has {}.",
					doc.id,
					doc.vector.len(),
					vector.len()
				)));
			}

			let score = cosine(vector, &doc.vector);

			if score < min_score {
				continue;
			}

			hits.push(StoreHit {
				id: doc.id.clone(),
				text: doc.text.clone(),
				score,
				metadata: doc.metadata.clone(),
			});
		}

		hits.sort_by(|a, b| cmp_f32_desc(a.score, b.score));
		hits.truncate(k as usize);

		Ok(hits)
	}

	fn check_dimensions(&self, vector_dim: u32) -> Result<()> {
		match self.documents.iter().find(|doc| doc.vector.len() != vector_dim as usize) {
			Some(doc) => Err(Error::InvalidSnapshot(format!(
				"Document {} has {} dimensions, expected {vector_dim}.",
				doc.id,
				doc.vector.len()
			))),
			None => Ok(()),
		}
	}
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
	let mut dot = 0.0_f32;
	let mut norm_a = 0.0_f32;
	let mut norm_b = 0.0_f32;

	for (x, y) in a.iter().zip(b) {
		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return 0.0;
	}

	dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
