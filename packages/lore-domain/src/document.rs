use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Metadata key under which some stores echo the raw embedding vector.
pub const EMBEDDING_METADATA_KEY: &str = "embedding";

pub type Metadata = BTreeMap<String, MetadataValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
	Integer(i64),
	Float(f64),
	Text(String),
}
impl MetadataValue {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text.as_str()),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Self::Integer(value) => Some(*value as f64),
			Self::Float(value) => Some(*value),
			Self::Text(_) => None,
		}
	}

	/// Equality used by filter predicates. Numbers compare numerically across
	/// integer and float; text never equals a number.
	pub fn loosely_equals(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Text(left), Self::Text(right)) => left == right,
			(Self::Integer(left), Self::Integer(right)) => left == right,
			(Self::Text(_), _) | (_, Self::Text(_)) => false,
			_ => self.as_f64() == other.as_f64(),
		}
	}
}
impl fmt::Display for MetadataValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Integer(value) => write!(f, "{value}"),
			Self::Float(value) => write!(f, "{value:?}"),
			Self::Text(text) => f.write_str(text),
		}
	}
}
impl From<&str> for MetadataValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}
impl From<String> for MetadataValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<i64> for MetadataValue {
	fn from(value: i64) -> Self {
		Self::Integer(value)
	}
}
impl From<f64> for MetadataValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

/// One retrieved snippet. `score` is only comparable within a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
	pub text: String,
	pub source_id: String,
	pub score: f64,
	pub metadata: Metadata,
}
impl Match {
	pub fn new(
		text: impl Into<String>,
		source_id: impl Into<String>,
		score: f64,
		mut metadata: Metadata,
	) -> Self {
		metadata.remove(EMBEDDING_METADATA_KEY);

		Self { text: text.into(), source_id: source_id.into(), score, metadata }
	}

	pub fn with_score(&self, score: f64) -> Self {
		Self { score, ..self.clone() }
	}

	/// Lower-cased text form of a metadata field, empty when absent.
	pub fn field_text(&self, key: &str) -> String {
		self.metadata.get(key).map(|value| value.to_string().to_lowercase()).unwrap_or_default()
	}

	pub fn metadata_str(&self, key: &str) -> Option<&str> {
		self.metadata.get(key).and_then(MetadataValue::as_str)
	}
}
