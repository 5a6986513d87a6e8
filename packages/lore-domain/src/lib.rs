pub mod document;
pub mod filter;
pub mod keywords;

pub use document::{EMBEDDING_METADATA_KEY, Match, Metadata, MetadataValue};
pub use filter::{Filter, QueryContext};
pub use keywords::KeywordSet;
