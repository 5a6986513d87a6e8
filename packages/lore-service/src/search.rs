pub mod rerank;

use serde::{Deserialize, Serialize};

use crate::{RagService, ServiceError, ServiceResult, StoreQuery};
use lore_config::Overfetch;
use lore_domain::{
	Filter, Match, QueryContext,
	filter::{self, EXTENSION_KEY, LIBRARIES_KEY},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	/// Falls back to `rag.max_results`. Values below one are raised to one.
	pub max_results: Option<u32>,
	pub extension: Option<String>,
	/// Comma-separated. Falls back to `rag.libraries`.
	pub libraries: Option<String>,
	pub use_metadata_boost: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
	pub matches: Vec<Match>,
}

impl RagService {
	pub async fn search(&self, req: SearchRequest) -> ServiceResult<SearchResponse> {
		self.require_store()?;

		if req.query.trim().is_empty() {
			return Err(ServiceError::InvalidRequest {
				message: "query must be non-empty.".to_string(),
			});
		}

		let max_results = req.max_results.unwrap_or(self.cfg.rag.max_results).max(1);
		let libraries = req.libraries.or_else(|| self.cfg.rag.libraries.clone());
		let use_boost = req.use_metadata_boost.unwrap_or(true);
		let mut context = QueryContext::new();

		if let Some(libraries) = libraries {
			context.insert(LIBRARIES_KEY, libraries);
		}
		if let Some(extension) = req.extension {
			context.insert(EXTENSION_KEY, extension);
		}

		let filter = filter::build_filter(&context);

		if let Some(filter) = filter.as_ref() {
			tracing::info!(?filter, "Narrowing search by metadata.");
		}

		let candidates = self.retrieve(&req.query, filter, max_results, use_boost).await?;
		let mut matches = rerank::rerank(candidates, &req.query, use_boost, max_results);

		matches.truncate(max_results as usize);

		Ok(SearchResponse { matches })
	}

	/// Embeds `query_text` and fetches candidates. Similarity floors are left to the caller.
	pub async fn retrieve(
		&self,
		query_text: &str,
		filter: Option<Filter>,
		requested: u32,
		overfetch: bool,
	) -> ServiceResult<Vec<Match>> {
		let store = self.require_store()?;
		let embedding_cfg = &self.cfg.providers.embedding;
		let vectors = self.providers.embedding.embed(embedding_cfg, &[query_text.to_string()]).await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(ServiceError::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vector.len() != embedding_cfg.dimensions as usize {
			return Err(ServiceError::Provider {
				message: format!(
					"Embedding has {} dimensions, expected {}.",
					vector.len(),
					embedding_cfg.dimensions
				),
			});
		}

		let k = fetch_count(requested, overfetch, &self.cfg.rag.overfetch);
		let query = StoreQuery { vector, filter, k, min_score: 0.0 };
		let hits = store
			.search(&query)
			.await
			.map_err(|err| ServiceError::Store { message: err.to_string() })?;

		tracing::debug!(requested, k, hits = hits.len(), "Retrieved candidates.");

		Ok(hits
			.into_iter()
			.map(|hit| Match::new(hit.text, hit.id, f64::from(hit.score), hit.metadata))
			.collect())
	}
}

/// Number of candidates to request from the store.
pub fn fetch_count(requested: u32, overfetch: bool, cfg: &Overfetch) -> u32 {
	if overfetch { requested.saturating_mul(cfg.multiplier).max(cfg.floor) } else { requested }
}
