mod error;

pub use error::{Error, Result};

use std::{
	env,
	sync::{
		Mutex,
		atomic::{AtomicU64, AtomicUsize, Ordering},
	},
	thread,
	time::Duration,
};

use color_eyre::eyre;
use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, UpsertPointsBuilder, VectorParamsBuilder,
	},
};
use serde_json::{Map, Value};
use tokio::{runtime::Builder, time};

use lore_config::{
	Config, EmbeddingProviderConfig, Overfetch, Providers, Rag, Service, Snapshot, Storage,
};
use lore_domain::{Match, Metadata, MetadataValue};
use lore_service::{BoxFuture, EmbeddingProvider, StoreQuery, VectorStore};
use lore_storage::models::{SnapshotDocument, StoreHit};

pub const TEST_DIMENSIONS: u32 = 3;
pub const TEXT_FIELD: &str = "text_segment";

/// Returns every text the same vector.
pub struct FixedEmbedding {
	vector: Vec<f32>,
	calls: AtomicUsize,
}
impl FixedEmbedding {
	pub fn new(vector: Vec<f32>) -> Self {
		Self { vector, calls: AtomicUsize::new(0) }
	}

	pub fn unit() -> Self {
		Self::new(vec![1.0, 0.0, 0.0])
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for FixedEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let vectors = vec![self.vector.clone(); texts.len()];

		Box::pin(async move { Ok(vectors) })
	}
}

pub struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Err(eyre::eyre!("Embedding backend is unreachable.")) })
	}
}

/// Serves canned hits in their given order, honouring the filter and `k`, and keeps every
/// query it receives.
#[derive(Default)]
pub struct RecordingStore {
	hits: Vec<StoreHit>,
	queries: Mutex<Vec<StoreQuery>>,
}
impl RecordingStore {
	pub fn new(hits: Vec<StoreHit>) -> Self {
		Self { hits, queries: Mutex::new(Vec::new()) }
	}

	pub fn queries(&self) -> Vec<StoreQuery> {
		self.queries.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn last_query(&self) -> Option<StoreQuery> {
		self.queries().pop()
	}
}
impl VectorStore for RecordingStore {
	fn search<'a>(
		&'a self,
		query: &'a StoreQuery,
	) -> BoxFuture<'a, color_eyre::Result<Vec<StoreHit>>> {
		self.queries.lock().unwrap_or_else(|err| err.into_inner()).push(query.clone());

		let hits = self
			.hits
			.iter()
			.filter(|hit| query.filter.as_ref().is_none_or(|filter| filter.matches(&hit.metadata)))
			.filter(|hit| hit.score >= query.min_score)
			.take(query.k as usize)
			.cloned()
			.collect::<Vec<_>>();

		Box::pin(async move { Ok(hits) })
	}
}

pub struct FailingStore;
impl VectorStore for FailingStore {
	fn search<'a>(
		&'a self,
		_query: &'a StoreQuery,
	) -> BoxFuture<'a, color_eyre::Result<Vec<StoreHit>>> {
		Box::pin(async move { Err(eyre::eyre!("Vector store timed out.")) })
	}
}

/// Owns a uniquely named Qdrant collection and deletes it on cleanup or drop.
pub struct TestCollection {
	name: String,
	url: String,
	cleaned: bool,
}
impl TestCollection {
	pub async fn create(url: &str, prefix: &str, vector_dim: u32) -> Result<Self> {
		static COUNTER: AtomicU64 = AtomicU64::new(0);

		let name =
			format!("{prefix}_{}_{}", std::process::id(), COUNTER.fetch_add(1, Ordering::SeqCst));
		let client = connect(url)?;

		client
			.create_collection(
				CreateCollectionBuilder::new(name.clone())
					.vectors_config(VectorParamsBuilder::new(vector_dim as u64, Distance::Cosine)),
			)
			.await?;

		Ok(Self { name, url: url.to_string(), cleaned: false })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Upserts documents with the snippet text under [`TEXT_FIELD`] and metadata as payload.
	pub async fn seed(&self, documents: &[SnapshotDocument]) -> Result<()> {
		let client = connect(&self.url)?;
		let mut points = Vec::with_capacity(documents.len());

		for (index, doc) in documents.iter().enumerate() {
			let mut payload = match serde_json::to_value(&doc.metadata) {
				Ok(Value::Object(map)) => map,
				Ok(_) => Map::new(),
				Err(err) =>
					return Err(Error::Message(format!("Failed to encode payload: {err}."))),
			};

			payload.insert(TEXT_FIELD.to_string(), Value::from(doc.text.clone()));

			points.push(PointStruct::new(
				index as u64,
				doc.vector.clone(),
				Payload::try_from(Value::Object(payload))?,
			));
		}

		client.upsert_points(UpsertPointsBuilder::new(self.name.clone(), points).wait(true)).await?;

		Ok(())
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleaned = true;

		delete_collection(&self.url, &self.name).await
	}
}
impl Drop for TestCollection {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let name = self.name.clone();
		let url = self.url.clone();
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test collection cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(delete_collection(&url, &name)) {
				eprintln!("Test collection cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("LORE_QDRANT_URL").ok()
}

/// Minimal valid configuration with no storage backend and `TEST_DIMENSIONS`-sized vectors.
pub fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage::default(),
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions: TEST_DIMENSIONS,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		rag: Rag {
			enabled: true,
			max_results: 4,
			min_score: 0.82,
			libraries: None,
			snippet_max_chars: 1_400,
			augment_boost: true,
			overfetch: Overfetch::default(),
		},
	}
}

pub fn snapshot_config(path: impl Into<std::path::PathBuf>) -> Config {
	let mut cfg = test_config();

	cfg.storage.snapshot = Some(Snapshot { path: path.into() });

	cfg
}

pub fn metadata(fields: &[(&str, MetadataValue)]) -> Metadata {
	fields.iter().map(|(key, value)| (key.to_string(), value.clone())).collect()
}

pub fn store_hit(id: &str, text: &str, score: f32, fields: &[(&str, MetadataValue)]) -> StoreHit {
	StoreHit { id: id.to_string(), text: text.to_string(), score, metadata: metadata(fields) }
}

pub fn sample_match(id: &str, score: f64, fields: &[(&str, MetadataValue)]) -> Match {
	Match::new(format!("Snippet {id}."), id, score, metadata(fields))
}

pub fn snapshot_document(
	id: &str,
	text: &str,
	vector: Vec<f32>,
	fields: &[(&str, MetadataValue)],
) -> SnapshotDocument {
	SnapshotDocument {
		id: id.to_string(),
		text: text.to_string(),
		vector,
		metadata: metadata(fields),
	}
}

fn connect(url: &str) -> Result<Qdrant> {
	Qdrant::from_url(url)
		.build()
		.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))
}

async fn delete_collection(url: &str, name: &str) -> Result<()> {
	let client = connect(url)?;
	let max_attempts = 4;
	let mut backoff = Duration::from_millis(100);

	for attempt in 1..=max_attempts {
		let result =
			time::timeout(Duration::from_secs(10), client.delete_collection(name.to_string()))
				.await;

		match result {
			Ok(Ok(_)) => return Ok(()),
			Ok(Err(err)) =>
				if attempt == max_attempts {
					return Err(Error::Message(format!(
						"Failed to delete Qdrant collection {name:?} after {attempt} attempts: {err}."
					)));
				},
			Err(_) =>
				if attempt == max_attempts {
					return Err(Error::Message(format!(
						"Timed out deleting Qdrant collection {name:?} after {attempt} attempts."
					)));
				},
		}

		time::sleep(backoff).await;

		backoff = backoff.saturating_mul(2);
	}

	Ok(())
}
