use std::sync::LazyLock;

use regex::Regex;

static NON_KEYWORD_CHARS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[^a-z0-9\s-]").expect("static pattern must compile"));
static SHORT_TERM: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[a-z]{2,3}$").expect("static pattern must compile"));

const STOP_WORDS: &[&str] = &[
	"this", "that", "with", "from", "have", "does", "what", "when", "where", "which", "their",
	"about", "would", "there", "these", "using", "quarkus", "guide",
];

/// Query terms used for metadata boosting.
///
/// `direct` holds terms taken from the query itself, `synonyms` the related terms they expand to.
/// Both lists keep query order and repeats, so a term mentioned twice boosts twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
	pub direct: Vec<String>,
	pub synonyms: Vec<String>,
}
impl KeywordSet {
	pub fn from_query(query: &str) -> Self {
		let lowered = query.to_lowercase();
		let cleaned = NON_KEYWORD_CHARS.replace_all(&lowered, " ");
		let mut set = Self::default();

		for word in cleaned.split_whitespace() {
			if !is_candidate(word) || is_stop_word(word) {
				continue;
			}

			set.direct.push(word.to_string());
			set.synonyms.extend(synonyms(word).iter().map(|synonym| synonym.to_string()));
		}

		set
	}

	pub fn is_empty(&self) -> bool {
		self.direct.is_empty() && self.synonyms.is_empty()
	}
}

pub fn is_stop_word(word: &str) -> bool {
	STOP_WORDS.contains(&word)
}

/// Related terms for a lower-cased keyword.
///
/// The table is directional. `inject` has no entry so configuration injection
/// is not conflated with CDI.
pub fn synonyms(word: &str) -> &'static [&'static str] {
	match word {
		"startup" | "start" => &["lifecycle", "init", "initialization"],
		"lifecycle" => &["startup", "init"],
		"injection" => &["cdi", "dependency"],
		"cdi" => &["injection", "dependency"],
		"validation" | "validate" => &["hibernate-validator", "validator"],
		"validator" | "hibernate-validator" => &["validation", "validate"],
		"mode" => &["dev-mode", "continuous-testing"],
		"cors" => &["cross-origin"],
		_ => &[],
	}
}

// Long terms, or 2-3 letter acronyms such as "cdi" and "jwt".
fn is_candidate(word: &str) -> bool {
	word.chars().count() > 3 || SHORT_TERM.is_match(word)
}
