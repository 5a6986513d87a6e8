use std::{
	fs,
	path::{Path, PathBuf},
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use lore_domain::Match;
use lore_service::{RagService, SearchRequest};

pub const DEFAULT_MAX_RESULTS: u32 = 10;
pub const DEFAULT_LIBRARIES: &str = "quarkus,hibernate-orm";

const REPORTED_TOP: usize = 10;

#[derive(Debug, Parser)]
#[command(
	version = lore_cli::VERSION,
	rename_all = "kebab",
	styles = lore_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Library restriction for cases that do not set their own.
	#[arg(long, value_name = "CSV", default_value = DEFAULT_LIBRARIES)]
	pub libraries: String,
	#[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_RESULTS)]
	pub max_results: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalCase {
	pub id: String,
	pub query: String,
	#[serde(default, alias = "maxResults")]
	pub max_results: Option<u32>,
	#[serde(default, alias = "restrictToExtension")]
	pub restrict_to_extension: Option<String>,
	#[serde(default)]
	pub libraries: Option<String>,
	#[serde(default, alias = "useMetadataBoost")]
	pub use_metadata_boost: Option<bool>,
	#[serde(default)]
	pub assertions: Option<Assertions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Assertions {
	#[serde(default, alias = "minMatches")]
	pub min_matches: Option<usize>,
	#[serde(default, alias = "anyRepoPathEndsWith")]
	pub any_repo_path_ends_with: Vec<String>,
	/// Case-insensitive, checked against `repo_path` and `url`.
	#[serde(default, alias = "anyRepoPathContains")]
	pub any_repo_path_contains: Vec<String>,
	#[serde(default, alias = "minScoreAtRankLe")]
	pub min_score_at_rank_le: Option<ScoreAtRank>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScoreAtRank {
	pub rank: usize,
	pub score: f64,
}

/// Settings applied to cases that leave them unset.
#[derive(Debug, Clone, Serialize)]
pub struct EvalDefaults {
	pub libraries: String,
	pub max_results: u32,
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
	pub dataset: DatasetInfo,
	pub settings: EvalSettings,
	pub summary: EvalSummary,
	pub cases: Vec<CaseReport>,
}

#[derive(Debug, Serialize)]
pub struct DatasetInfo {
	pub path: String,
	pub case_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EvalSettings {
	pub config_path: String,
	#[serde(flatten)]
	pub defaults: EvalDefaults,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct EvalSummary {
	pub total: usize,
	pub passed: usize,
	pub failed: usize,
	/// Percentage of passing cases.
	pub success_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct CaseReport {
	pub id: String,
	pub query: String,
	pub passed: bool,
	pub failures: Vec<String>,
	pub top: Vec<RankedMatch>,
}

#[derive(Debug, Serialize)]
pub struct RankedMatch {
	pub rank: usize,
	pub score: f64,
	pub library: String,
	pub title: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = lore_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let cases = load_dataset(&args.dataset)?;

	if cases.is_empty() {
		return Err(eyre::eyre!("Dataset {} has no cases.", args.dataset.display()));
	}

	let service = RagService::from_config(config)?;

	if !service.is_available() {
		return Err(eyre::eyre!("Retrieval is unavailable; check rag.enabled and storage."));
	}

	let defaults = EvalDefaults { libraries: args.libraries, max_results: args.max_results };
	let reports = run_cases(&service, &cases, &defaults).await;
	let summary = summarize(&reports);
	let failed = summary.failed;
	let total = summary.total;
	let output = EvalOutput {
		dataset: DatasetInfo { path: args.dataset.display().to_string(), case_count: cases.len() },
		settings: EvalSettings { config_path: args.config.display().to_string(), defaults },
		summary,
		cases: reports,
	};
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	if failed > 0 {
		return Err(eyre::eyre!("{failed}/{total} golden set cases failed."));
	}

	Ok(())
}

pub fn load_dataset(path: &Path) -> color_eyre::Result<Vec<EvalCase>> {
	let raw = fs::read_to_string(path)?;
	let cases = serde_json::from_str(&raw)?;

	Ok(cases)
}

/// Runs every case in order. Search errors fail the case instead of the run.
pub async fn run_cases(
	service: &RagService,
	cases: &[EvalCase],
	defaults: &EvalDefaults,
) -> Vec<CaseReport> {
	let mut reports = Vec::with_capacity(cases.len());

	for case in cases {
		let request = SearchRequest {
			query: case.query.clone(),
			max_results: Some(case.max_results.unwrap_or(defaults.max_results)),
			extension: case.restrict_to_extension.clone(),
			libraries: Some(case.libraries.clone().unwrap_or_else(|| defaults.libraries.clone())),
			use_metadata_boost: Some(case.use_metadata_boost.unwrap_or(true)),
		};
		let (failures, top) = match service.search(request).await {
			Ok(response) => {
				let failures = case
					.assertions
					.as_ref()
					.map(|assertions| evaluate_case(assertions, &response.matches))
					.unwrap_or_default();

				(failures, top_matches(&response.matches))
			},
			Err(err) => (vec![format!("Search failed: {err}")], Vec::new()),
		};
		let passed = failures.is_empty();

		if passed {
			tracing::info!(case = %case.id, "Golden set case passed.");
		} else {
			tracing::warn!(case = %case.id, query = %case.query, ?failures, "Golden set case failed.");
		}

		reports.push(CaseReport {
			id: case.id.clone(),
			query: case.query.clone(),
			passed,
			failures,
			top,
		});
	}

	reports
}

/// Checks the assertions against ranked matches. Returns one message per failed assertion.
pub fn evaluate_case(assertions: &Assertions, matches: &[Match]) -> Vec<String> {
	let mut failures = Vec::new();

	match assertions.min_matches {
		Some(min) if matches.len() < min =>
			failures.push(format!("Expected at least {min} matches, got {}.", matches.len())),
		None if matches.is_empty() => failures.push("No results returned.".to_string()),
		_ => {},
	}

	let repo_paths = non_empty_values(matches, "repo_path");
	let urls = non_empty_values(matches, "url");

	if !assertions.any_repo_path_ends_with.is_empty() {
		let found = repo_paths.iter().any(|path| {
			assertions.any_repo_path_ends_with.iter().any(|suffix| path.ends_with(suffix.as_str()))
		});

		if !found {
			failures.push(format!(
				"No repo_path ends with any of {:?}. Actual paths: {repo_paths:?}.",
				assertions.any_repo_path_ends_with
			));
		}
	}
	if !assertions.any_repo_path_contains.is_empty() {
		let needles = assertions
			.any_repo_path_contains
			.iter()
			.map(|needle| needle.to_lowercase())
			.collect::<Vec<_>>();
		let found = repo_paths.iter().chain(&urls).any(|value| {
			let value = value.to_lowercase();

			needles.iter().any(|needle| value.contains(needle.as_str()))
		});

		if !found {
			failures.push(format!(
				"No repo_path or url contains any of {:?}. Actual paths: {repo_paths:?}. Actual urls: {urls:?}.",
				assertions.any_repo_path_contains
			));
		}
	}
	if let Some(ScoreAtRank { rank, score }) = assertions.min_score_at_rank_le {
		if matches.len() < rank {
			failures.push(format!("Not enough results (need {rank}, got {}).", matches.len()));
		} else if !matches.iter().take(rank).any(|m| m.score >= score) {
			let top_scores =
				matches.iter().take(rank).map(|m| format!("{:.4}", m.score)).collect::<Vec<_>>();

			failures.push(format!(
				"No result in top {rank} has score >= {score:.2}. Top scores: {top_scores:?}."
			));
		}
	}

	failures
}

pub fn summarize(reports: &[CaseReport]) -> EvalSummary {
	let total = reports.len();
	let passed = reports.iter().filter(|report| report.passed).count();
	let success_rate = if total == 0 { 0.0 } else { passed as f64 * 100.0 / total as f64 };

	EvalSummary { total, passed, failed: total - passed, success_rate }
}

fn top_matches(matches: &[Match]) -> Vec<RankedMatch> {
	matches
		.iter()
		.take(REPORTED_TOP)
		.enumerate()
		.map(|(index, m)| RankedMatch {
			rank: index + 1,
			score: m.score,
			library: m.metadata_str("library").unwrap_or("unknown").to_string(),
			title: m.metadata_str("title").unwrap_or("unknown").to_string(),
			url: m.metadata_str("url").filter(|url| !url.is_empty()).map(str::to_string),
		})
		.collect()
}

fn non_empty_values(matches: &[Match], key: &str) -> Vec<String> {
	matches
		.iter()
		.filter_map(|m| m.metadata_str(key))
		.filter(|value| !value.is_empty())
		.map(str::to_string)
		.collect()
}
