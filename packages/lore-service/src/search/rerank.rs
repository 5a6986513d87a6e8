use std::cmp::Ordering;

use lore_domain::{KeywordSet, Match};

/// Additive boosts for one metadata field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBoost {
	pub field: &'static str,
	pub direct: f64,
	pub synonym: f64,
}

pub const FIELD_BOOSTS: [FieldBoost; 4] = [
	FieldBoost { field: "title", direct: 0.15, synonym: 0.12 },
	FieldBoost { field: "repo_path", direct: 0.10, synonym: 0.08 },
	FieldBoost { field: "keywords", direct: 0.20, synonym: 0.15 },
	FieldBoost { field: "topics", direct: 0.25, synonym: 0.20 },
];

/// Boosts matches whose metadata mentions query terms, re-sorts and keeps `limit`.
///
/// Returns the input untouched when `enabled` is false or the query yields no terms.
pub fn rerank(matches: Vec<Match>, query: &str, enabled: bool, limit: u32) -> Vec<Match> {
	if !enabled {
		return matches;
	}

	let keywords = KeywordSet::from_query(query);

	if keywords.is_empty() {
		return matches;
	}

	tracing::debug!(direct = ?keywords.direct, synonyms = ?keywords.synonyms, "Metadata boost terms.");

	let mut boosted = matches
		.into_iter()
		.map(|candidate| {
			let score = boosted_score(&candidate, &keywords);

			if score > candidate.score { candidate.with_score(score) } else { candidate }
		})
		.collect::<Vec<_>>();

	boosted.sort_by(|a, b| cmp_f64_desc(a.score, b.score));
	boosted.truncate(limit as usize);

	boosted
}

// Sums per term, field by field, so repeated terms stack.
fn boosted_score(candidate: &Match, keywords: &KeywordSet) -> f64 {
	let fields = FIELD_BOOSTS.map(|boost| (boost, candidate.field_text(boost.field)));
	let mut score = candidate.score;

	for term in &keywords.direct {
		for (boost, value) in fields.iter().filter(|(_, value)| value.contains(term.as_str())) {
			tracing::debug!(
				source_id = %candidate.source_id,
				field = boost.field,
				term = %term,
				boost = boost.direct,
				"Direct keyword boost."
			);

			score += boost.direct;
		}
	}
	for term in &keywords.synonyms {
		for (boost, value) in fields.iter().filter(|(_, value)| value.contains(term.as_str())) {
			tracing::debug!(
				source_id = %candidate.source_id,
				field = boost.field,
				term = %term,
				boost = boost.synonym,
				"Synonym boost."
			);

			score += boost.synonym;
		}
	}

	score
}

pub fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use lore_domain::Metadata;

	fn candidate(id: &str, score: f64, fields: &[(&str, &str)]) -> Match {
		let metadata = fields
			.iter()
			.map(|(key, value)| (key.to_string(), (*value).into()))
			.collect::<Metadata>();

		Match::new(format!("text {id}"), id, score, metadata)
	}

	fn ids(matches: &[Match]) -> Vec<&str> {
		matches.iter().map(|m| m.source_id.as_str()).collect()
	}

	#[test]
	fn disabled_is_identity() {
		let input = vec![
			candidate("a", 0.5, &[("title", "Lifecycle")]),
			candidate("b", 0.9, &[]),
			candidate("c", 0.7, &[]),
		];

		assert_eq!(rerank(input.clone(), "startup lifecycle", false, 1), input);
	}

	#[test]
	fn query_without_terms_returns_input() {
		let input = vec![candidate("a", 0.5, &[("title", "this")]), candidate("b", 0.9, &[])];

		assert_eq!(rerank(input.clone(), "what about this?", true, 1), input);
	}

	#[test]
	fn startup_query_gets_synonym_topic_boost() {
		let input = vec![
			candidate("plain", 0.80, &[("topics", "core")]),
			candidate("lifecycle", 0.80, &[("topics", "lifecycle")]),
		];
		let out = rerank(input, "startup", true, 10);

		assert_eq!(ids(&out), ["lifecycle", "plain"]);
		assert!((out[0].score - out[1].score - 0.20).abs() < 1e-9);
		assert_eq!(out[1].score, 0.80);
	}

	#[test]
	fn boosts_are_additive_across_fields_and_terms() {
		let input = vec![candidate(
			"guide",
			0.5,
			&[
				("title", "CDI Reference"),
				("repo_path", "docs/cdi-reference.adoc"),
				("keywords", "cdi,injection"),
				("topics", "dependency injection"),
			],
		)];
		let out = rerank(input, "cdi", true, 10);
		// direct "cdi": title .15, repo_path .10, keywords .20
		// synonyms "injection": keywords .15, topics .20; "dependency": topics .20
		let expected = 0.5 + 0.15 + 0.10 + 0.20 + 0.15 + 0.20 + 0.20;

		assert!((out[0].score - expected).abs() < 1e-9);
	}

	#[test]
	fn repeated_terms_stack_their_boosts() {
		let input = vec![candidate("lifecycle", 0.5, &[("topics", "lifecycle")])];
		let out = rerank(input, "startup start", true, 10);

		// "lifecycle" is a synonym of both terms: 2 * .20
		assert!((out[0].score - 0.9).abs() < 1e-9);
	}

	#[test]
	fn unmatched_candidates_keep_exact_scores() {
		let input = vec![
			candidate("a", 0.613, &[("title", "Datasources")]),
			candidate("b", 0.42, &[("repo_path", "docs/security.adoc")]),
		];
		let out = rerank(input.clone(), "kafka streams", true, 10);

		assert_eq!(out, input);
	}

	#[test]
	fn every_raised_score_has_a_matching_field() {
		let input = vec![
			candidate("a", 0.7, &[("title", "Validation with Hibernate Validator")]),
			candidate("b", 0.8, &[("title", "Datasources")]),
			candidate("c", 0.6, &[("topics", "validator")]),
		];
		let original = input.clone();
		let keywords = KeywordSet::from_query("validate input");
		let out = rerank(input, "validate input", true, 10);

		for m in &out {
			let before = original.iter().find(|o| o.source_id == m.source_id).expect("present");

			if m.score > before.score {
				let hit = FIELD_BOOSTS.iter().any(|boost| {
					let value = m.field_text(boost.field);

					keywords.direct.iter().chain(&keywords.synonyms).any(|t| value.contains(t.as_str()))
				});

				assert!(hit, "{} was boosted without a matching field", m.source_id);
			} else {
				assert_eq!(m.score, before.score);
			}
		}
	}

	#[test]
	fn ties_keep_store_order_and_limit_truncates() {
		let input = vec![
			candidate("first", 0.5, &[]),
			candidate("second", 0.5, &[]),
			candidate("boosted", 0.4, &[("title", "kafka")]),
			candidate("third", 0.5, &[]),
		];
		let out = rerank(input, "kafka", true, 3);

		assert_eq!(ids(&out), ["boosted", "first", "second"]);
	}

	#[test]
	fn rerank_is_deterministic() {
		let input = vec![
			candidate("a", 0.71, &[("title", "Dev Mode")]),
			candidate("b", 0.75, &[("topics", "continuous-testing")]),
			candidate("c", 0.80, &[]),
		];
		let once = rerank(input.clone(), "dev mode", true, 10);
		let again = rerank(input, "dev mode", true, 10);

		assert_eq!(once, again);
		assert_eq!(ids(&once), ["a", "b", "c"]);
	}

	#[test]
	fn sorted_unboosted_input_is_stable_under_repeated_rerank() {
		let input = vec![
			candidate("a", 0.91, &[("title", "Datasources")]),
			candidate("b", 0.88, &[("topics", "security")]),
			candidate("c", 0.88, &[]),
			candidate("d", 0.70, &[("repo_path", "docs/rest.adoc")]),
		];
		let once = rerank(input.clone(), "kafka streams", true, 10);
		let twice = rerank(once.clone(), "kafka streams", true, 10);

		assert_eq!(once, input);
		assert_eq!(twice, once);
	}

	#[test]
	fn nan_scores_sort_last() {
		let mut scores = vec![0.2, f64::NAN, 0.9];

		scores.sort_by(|a, b| cmp_f64_desc(*a, *b));

		assert_eq!(scores[0], 0.9);
		assert_eq!(scores[1], 0.2);
		assert!(scores[2].is_nan());
	}
}
