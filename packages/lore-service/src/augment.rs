use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{RagService, ServiceResult, search::rerank};
use lore_domain::{Filter, Match, QueryContext, filter};

pub const CONTEXT_DELIMITER: &str = "\n---\n";
pub const TRUNCATION_MARKER: &str = " …";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	System,
	User,
	Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: Role,
	pub text: String,
}
impl ChatMessage {
	pub fn user(text: impl Into<String>) -> Self {
		Self { role: Role::User, text: text.into() }
	}

	pub fn system(text: impl Into<String>) -> Self {
		Self { role: Role::System, text: text.into() }
	}

	pub fn assistant(text: impl Into<String>) -> Self {
		Self { role: Role::Assistant, text: text.into() }
	}

	pub fn is_user(&self) -> bool {
		self.role == Role::User
	}
}

/// What a [`FilterSource`] sees for one augmentation call.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
	pub text: &'a str,
	pub context: &'a QueryContext,
}

/// Chooses the metadata filter for a query at augmentation time.
pub trait FilterSource
where
	Self: Send + Sync,
{
	fn filter_for(&self, query: &Query<'_>) -> Option<Filter>;
}

/// Builds the filter from the `libraries` and `extension` context variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextFilter;
impl FilterSource for ContextFilter {
	fn filter_for(&self, query: &Query<'_>) -> Option<Filter> {
		let filter = filter::build_filter(query.context);

		if let Some(filter) = filter.as_ref() {
			tracing::info!(?filter, "Narrowing augmentation by metadata.");
		}

		filter
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;
impl FilterSource for NoFilter {
	fn filter_for(&self, _query: &Query<'_>) -> Option<Filter> {
		None
	}
}

/// Merges ranked snippets into the outgoing user message.
#[derive(Debug, Clone)]
pub struct ContextInjector {
	pub snippet_max_chars: usize,
	pub max_results: usize,
}
impl ContextInjector {
	pub fn new(snippet_max_chars: usize, max_results: usize) -> Self {
		Self { snippet_max_chars, max_results }
	}

	pub fn from_config(rag: &lore_config::Rag) -> Self {
		Self::new(rag.snippet_max_chars as usize, rag.max_results as usize)
	}

	/// A missing message becomes an empty user message. Non-user messages, empty match
	/// lists and all-blank snippets leave the message as it was.
	pub fn inject(&self, matches: &[Match], message: Option<ChatMessage>) -> ChatMessage {
		let Some(message) = message else {
			return ChatMessage::user("");
		};

		if !message.is_user() {
			return message;
		}

		let Some(block) = self.context_block(matches) else {
			return message;
		};
		let wrapped = wrap_context(&block);
		let text = if message.text.trim().is_empty() {
			wrapped
		} else {
			format!("{}\n\n{wrapped}", message.text)
		};

		ChatMessage::user(text)
	}

	/// Truncated, non-blank snippets in rank order, capped at `max_results`.
	pub fn context_block(&self, matches: &[Match]) -> Option<String> {
		let snippets = matches
			.iter()
			.map(|m| truncate_snippet(&m.text, self.snippet_max_chars))
			.filter(|snippet| !snippet.trim().is_empty())
			.take(self.max_results)
			.collect::<Vec<_>>();
		let block = snippets.join(CONTEXT_DELIMITER);

		if block.trim().is_empty() { None } else { Some(block) }
	}
}

/// Retrieval, reranking and injection bound to one filter strategy.
pub struct Augmentor<'a> {
	service: &'a RagService,
	filter_source: Arc<dyn FilterSource>,
	injector: ContextInjector,
}
impl Augmentor<'_> {
	/// Retrieves context for a user message and injects it.
	///
	/// A missing message yields an empty user message. Non-user messages and user messages with
	/// blank text come back unchanged and make no embedder or store call, so the block-only
	/// result of [`ContextInjector::inject`] for blank text is reachable only by calling the
	/// injector directly.
	pub async fn augment(
		&self,
		message: Option<ChatMessage>,
		context: &QueryContext,
	) -> ServiceResult<ChatMessage> {
		let Some(message) = message else {
			return Ok(self.injector.inject(&[], None));
		};

		if !message.is_user() || message.text.trim().is_empty() {
			return Ok(message);
		}

		let rag = &self.service.cfg.rag;
		let query = Query { text: &message.text, context };
		let filter = self.filter_source.filter_for(&query);
		let mut matches =
			self.service.retrieve(&message.text, filter, rag.max_results, rag.augment_boost).await?;

		// Store scores are f32; compare the floor at that precision.
		let min_score = f64::from(rag.min_score as f32);

		matches.retain(|m| m.score >= min_score);

		let mut matches = rerank::rerank(matches, &message.text, rag.augment_boost, rag.max_results);

		matches.truncate(rag.max_results as usize);

		tracing::debug!(matches = matches.len(), "Injecting retrieved context.");

		Ok(self.injector.inject(&matches, Some(message)))
	}

	/// Like [`Self::augment`], but any failure leaves the message unaugmented.
	pub async fn augment_or_passthrough(
		&self,
		message: Option<ChatMessage>,
		context: &QueryContext,
	) -> ChatMessage {
		match self.augment(message.clone(), context).await {
			Ok(augmented) => augmented,
			Err(err) => {
				tracing::warn!(error = %err, "Augmentation failed; continuing without context.");

				message.unwrap_or_else(|| ChatMessage::user(""))
			},
		}
	}
}

impl RagService {
	/// `None` when retrieval is disabled or no store is configured.
	pub fn augmentor(&self, filter_source: Arc<dyn FilterSource>) -> Option<Augmentor<'_>> {
		if !self.is_available() {
			return None;
		}

		Some(Augmentor {
			service: self,
			filter_source,
			injector: ContextInjector::from_config(&self.cfg.rag),
		})
	}
}

fn truncate_snippet(text: &str, max_chars: usize) -> String {
	match text.char_indices().nth(max_chars) {
		Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
		None => text.to_string(),
	}
}

fn wrap_context(block: &str) -> String {
	format!(
		"[RAG CONTEXT]\n\
		Use this as a guide only. It may be incomplete or irrelevant.\n\
		If it conflicts with known facts or user intent, explain and prefer correctness.\n\
		If irrelevant, say so and answer without it.\n\
		\n\
		<context>\n\
		{block}\n\
		</context>\n\
		[/RAG CONTEXT]\n"
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use lore_domain::Metadata;

	fn snippet(text: &str) -> Match {
		Match::new(text, "id", 0.9, Metadata::new())
	}

	fn injector() -> ContextInjector {
		ContextInjector::new(1_400, 4)
	}

	#[test]
	fn missing_message_becomes_empty_user_message() {
		assert_eq!(injector().inject(&[snippet("ctx")], None), ChatMessage::user(""));
	}

	#[test]
	fn non_user_and_empty_inputs_are_untouched() {
		let system = ChatMessage::system("be brief");
		let user = ChatMessage::user("hello");

		assert_eq!(injector().inject(&[snippet("ctx")], Some(system.clone())), system);
		assert_eq!(injector().inject(&[], Some(user.clone())), user);
		assert_eq!(
			injector().inject(&[snippet("   "), snippet("\n\t")], Some(user.clone())),
			user
		);
	}

	#[test]
	fn wraps_block_after_user_text() {
		let out = injector()
			.inject(&[snippet("first"), snippet(" "), snippet("second")], Some(ChatMessage::user("Q?")));
		let expected = "Q?\n\n[RAG CONTEXT]\n\
			Use this as a guide only. It may be incomplete or irrelevant.\n\
			If it conflicts with known facts or user intent, explain and prefer correctness.\n\
			If irrelevant, say so and answer without it.\n\
			\n\
			<context>\n\
			first\n---\nsecond\n\
			</context>\n\
			[/RAG CONTEXT]\n";

		assert_eq!(out.role, Role::User);
		assert_eq!(out.text, expected);
	}

	#[test]
	fn blank_user_text_gets_block_only() {
		let out = injector().inject(&[snippet("ctx")], Some(ChatMessage::user("  ")));

		assert!(out.text.starts_with("[RAG CONTEXT]\n"));
		assert!(out.text.contains("<context>\nctx\n</context>"));
	}

	#[test]
	fn long_snippets_are_truncated_with_marker() {
		let long = "x".repeat(2_000);
		let block = injector().context_block(&[snippet(&long)]).expect("block");

		assert_eq!(block.chars().count(), 1_400 + TRUNCATION_MARKER.chars().count());
		assert!(block.ends_with(" …"));
		assert_eq!(truncate_snippet("short", 1_400), "short");
		assert_eq!(truncate_snippet("ééé", 2), "éé …");
	}

	#[test]
	fn cap_applies_after_dropping_blanks() {
		let matches =
			["", "a", " ", "b", "c", "d", "e"].iter().map(|text| snippet(text)).collect::<Vec<_>>();
		let block = injector().context_block(&matches).expect("block");

		assert_eq!(block, "a\n---\nb\n---\nc\n---\nd");
	}

	#[test]
	fn roles_serialize_lowercase() {
		let json = serde_json::to_string(&ChatMessage::assistant("hi")).expect("serialize");

		assert_eq!(json, r#"{"role":"assistant","text":"hi"}"#);
	}

	#[test]
	fn no_filter_never_narrows() {
		let context = QueryContext::new().with("libraries", "quarkus");
		let query = Query { text: "q", context: &context };

		assert_eq!(NoFilter.filter_for(&query), None);
		assert_eq!(
			ContextFilter.filter_for(&query),
			Some(Filter::equals("library", "quarkus"))
		);
	}
}
