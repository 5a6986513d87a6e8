use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub rag: Rag,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

/// At most one backend may be configured. With neither, retrieval is unavailable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
	pub qdrant: Option<Qdrant>,
	pub snapshot: Option<Snapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	/// Optional. Named vector to query when the collection stores several.
	pub vector_name: Option<String>,
	/// Payload key holding the snippet text.
	#[serde(default = "default_text_field")]
	pub text_field: String,
	#[serde(default = "default_store_timeout_ms")]
	pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
	pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rag {
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub max_results: u32,
	pub min_score: f64,
	/// Optional. Comma-separated default library restriction, e.g. "quarkus,hibernate-orm".
	pub libraries: Option<String>,
	#[serde(default = "default_snippet_max_chars")]
	pub snippet_max_chars: u32,
	/// Rerank retrieved content by metadata before it is injected into a prompt.
	#[serde(default = "default_true")]
	pub augment_boost: bool,
	#[serde(default)]
	pub overfetch: Overfetch,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Overfetch {
	pub multiplier: u32,
	pub floor: u32,
}
impl Default for Overfetch {
	fn default() -> Self {
		Self { multiplier: 5, floor: 50 }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_text_field() -> String {
	"text_segment".to_string()
}

fn default_store_timeout_ms() -> u64 {
	5_000
}

fn default_snippet_max_chars() -> u32 {
	1_400
}

fn default_true() -> bool {
	true
}
