use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Qdrant(#[from] Box<qdrant_client::QdrantError>),
	#[error("Unsupported filter: {0}")]
	UnsupportedFilter(String),
	#[error("Failed to read snapshot at {path:?}.")]
	ReadSnapshot { path: PathBuf, source: std::io::Error },
	#[error("Failed to parse snapshot at {path:?}.")]
	ParseSnapshot { path: PathBuf, source: serde_json::Error },
	#[error("Invalid snapshot: {0}")]
	InvalidSnapshot(String),
}
impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant(Box::new(err))
	}
}
