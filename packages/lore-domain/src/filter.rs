use std::collections::BTreeMap;

use crate::document::{Metadata, MetadataValue};

pub const LIBRARIES_KEY: &str = "libraries";
pub const EXTENSION_KEY: &str = "extension";
pub const LIBRARY_FIELD: &str = "library";
/// Stored as a comma-padded list, e.g. ",quarkus-rest,quarkus-jackson,".
pub const EXTENSIONS_FIELD: &str = "extensions_csv_padded";

const ANY: &str = "any";

/// Metadata predicate tree. Folds over lists are left-associative.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
	Equals { field: String, value: MetadataValue },
	ContainsSubstring { field: String, substring: String },
	And(Box<Filter>, Box<Filter>),
	Or(Box<Filter>, Box<Filter>),
}
impl Filter {
	pub fn equals(field: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
		Self::Equals { field: field.into(), value: value.into() }
	}

	pub fn contains_substring(field: impl Into<String>, substring: impl Into<String>) -> Self {
		Self::ContainsSubstring { field: field.into(), substring: substring.into() }
	}

	pub fn and(self, right: Self) -> Self {
		Self::And(Box::new(self), Box::new(right))
	}

	pub fn or(self, right: Self) -> Self {
		Self::Or(Box::new(self), Box::new(right))
	}

	pub fn matches(&self, metadata: &Metadata) -> bool {
		match self {
			Self::Equals { field, value } =>
				metadata.get(field).map(|stored| stored.loosely_equals(value)).unwrap_or(false),
			Self::ContainsSubstring { field, substring } => metadata
				.get(field)
				.map(|stored| stored.to_string().contains(substring.as_str()))
				.unwrap_or(false),
			Self::And(left, right) => left.matches(metadata) && right.matches(metadata),
			Self::Or(left, right) => left.matches(metadata) || right.matches(metadata),
		}
	}
}

/// Request-scoped variables such as `libraries` and `extension`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryContext {
	variables: BTreeMap<String, String>,
}
impl QueryContext {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.insert(key, value);

		self
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.variables.insert(key.into(), value.into());
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.variables.get(key).map(String::as_str)
	}

	pub fn is_empty(&self) -> bool {
		self.variables.is_empty()
	}
}
impl<K, V> FromIterator<(K, V)> for QueryContext
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut context = Self::new();

		for (key, value) in iter {
			context.insert(key, value);
		}

		context
	}
}

/// Library and extension predicates from the context, joined with `And`.
pub fn build_filter(context: &QueryContext) -> Option<Filter> {
	let library = context.get(LIBRARIES_KEY).and_then(library_filter);
	let extension = context.get(EXTENSION_KEY).and_then(extension_filter);

	combine_filters([library, extension])
}

/// `Equals` for one library, a left-folded `Or` chain for several, in input order.
pub fn library_filter(libraries: &str) -> Option<Filter> {
	let trimmed = libraries.trim();

	if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ANY) {
		return None;
	}

	trimmed
		.split(',')
		.map(str::trim)
		.filter(|library| !library.is_empty())
		.map(|library| Filter::equals(LIBRARY_FIELD, library))
		.reduce(Filter::or)
}

/// Substring match against the padded extension list, padded the same way as the index.
pub fn extension_filter(extension: &str) -> Option<Filter> {
	let trimmed = extension.trim();

	if trimmed.eq_ignore_ascii_case(ANY) {
		return None;
	}

	let bare = trimmed.trim_matches(',').trim();

	if bare.is_empty() {
		return None;
	}

	Some(Filter::contains_substring(EXTENSIONS_FIELD, pad_extension(bare)))
}

pub fn pad_extension(extension: &str) -> String {
	format!(",{extension},")
}

/// Folds the present filters with `And` in input order.
pub fn combine_filters<I>(filters: I) -> Option<Filter>
where
	I: IntoIterator<Item = Option<Filter>>,
{
	filters.into_iter().flatten().reduce(Filter::and)
}
