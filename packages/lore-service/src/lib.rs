pub mod augment;
pub mod search;

mod error;

pub use augment::{
	Augmentor, ChatMessage, ContextFilter, ContextInjector, FilterSource, NoFilter, Query, Role,
};
pub use error::{ServiceError, ServiceResult};
pub use search::{SearchRequest, SearchResponse, rerank::rerank};

use std::{future::Future, pin::Pin, sync::Arc};

use lore_config::{Config, EmbeddingProviderConfig};
use lore_domain::Filter;
use lore_providers::embedding;
use lore_storage::{models::StoreHit, qdrant::QdrantStore, snapshot::SnapshotStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// Nearest-neighbour lookup request handed to a [`VectorStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
	pub vector: Vec<f32>,
	pub filter: Option<Filter>,
	pub k: u32,
	pub min_score: f32,
}

pub trait VectorStore
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		query: &'a StoreQuery,
	) -> BoxFuture<'a, color_eyre::Result<Vec<StoreHit>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

pub struct RagService {
	pub cfg: Config,
	pub store: Option<Arc<dyn VectorStore>>,
	pub providers: Providers,
}
impl RagService {
	pub fn new(cfg: Config, store: Option<Arc<dyn VectorStore>>) -> Self {
		Self { cfg, store, providers: Providers::default() }
	}

	pub fn with_providers(
		cfg: Config,
		store: Option<Arc<dyn VectorStore>>,
		providers: Providers,
	) -> Self {
		Self { cfg, store, providers }
	}

	/// Opens the configured backend. A disabled or storeless configuration yields an
	/// unavailable service rather than an error.
	pub fn from_config(cfg: Config) -> ServiceResult<Self> {
		let store = open_store(&cfg)?;

		Ok(Self::new(cfg, store))
	}

	pub fn is_available(&self) -> bool {
		self.cfg.rag.enabled && self.store.is_some()
	}

	pub(crate) fn require_store(&self) -> ServiceResult<&Arc<dyn VectorStore>> {
		if !self.cfg.rag.enabled {
			return Err(ServiceError::Unavailable { message: "RAG is disabled.".to_string() });
		}

		self.store.as_ref().ok_or_else(|| ServiceError::Unavailable {
			message: "No vector store is configured.".to_string(),
		})
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl VectorStore for QdrantStore {
	fn search<'a>(
		&'a self,
		query: &'a StoreQuery,
	) -> BoxFuture<'a, color_eyre::Result<Vec<StoreHit>>> {
		Box::pin(async move {
			let hits = QdrantStore::search(
				self,
				query.vector.clone(),
				query.filter.as_ref(),
				query.k,
				query.min_score,
			)
			.await?;

			Ok(hits)
		})
	}
}

impl VectorStore for SnapshotStore {
	fn search<'a>(
		&'a self,
		query: &'a StoreQuery,
	) -> BoxFuture<'a, color_eyre::Result<Vec<StoreHit>>> {
		Box::pin(async move {
			let hits = SnapshotStore::search(
				self,
				&query.vector,
				query.filter.as_ref(),
				query.k,
				query.min_score,
			)?;

			Ok(hits)
		})
	}
}

fn open_store(cfg: &Config) -> ServiceResult<Option<Arc<dyn VectorStore>>> {
	if !cfg.rag.enabled {
		tracing::warn!("RAG is disabled; retrieval is unavailable.");

		return Ok(None);
	}

	if let Some(qdrant) = cfg.storage.qdrant.as_ref() {
		let store = QdrantStore::new(qdrant)?;

		tracing::info!(url = %qdrant.url, collection = %qdrant.collection, "Using Qdrant store.");

		return Ok(Some(Arc::new(store)));
	}
	if let Some(snapshot) = cfg.storage.snapshot.as_ref() {
		let store = SnapshotStore::open(snapshot, cfg.providers.embedding.dimensions)?;

		return Ok(Some(Arc::new(store)));
	}

	tracing::warn!("No vector store is configured; retrieval is unavailable.");

	Ok(None)
}
