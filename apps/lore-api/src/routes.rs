use std::{collections::BTreeMap, sync::Arc};

use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use lore_domain::QueryContext;
use lore_service::{ChatMessage, ContextFilter, SearchRequest, SearchResponse, ServiceError};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchBody {
	pub query_message: String,
	pub max_results: Option<u32>,
	pub extension: Option<String>,
	pub libraries: Option<String>,
	pub use_metadata_boost: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AugmentBody {
	pub message: Option<ChatMessage>,
	#[serde(default)]
	pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct AugmentResponse {
	pub message: ChatMessage,
	pub augmented: bool,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/search", post(search))
		.route("/api/augment", post(augment))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
	tracing::info!(
		query = %payload.query_message,
		extension = ?payload.extension,
		libraries = ?payload.libraries,
		"Search request."
	);

	let request = SearchRequest {
		query: payload.query_message,
		max_results: payload.max_results,
		extension: payload.extension,
		libraries: payload.libraries,
		use_metadata_boost: payload.use_metadata_boost,
	};
	let response = state.service.search(request).await?;

	Ok(Json(response))
}

async fn augment(
	State(state): State<AppState>,
	Json(payload): Json<AugmentBody>,
) -> Json<AugmentResponse> {
	let Some(augmentor) = state.service.augmentor(Arc::new(ContextFilter)) else {
		let message = payload.message.unwrap_or_else(|| ChatMessage::user(""));

		return Json(AugmentResponse { message, augmented: false });
	};
	let context = payload.variables.into_iter().collect::<QueryContext>();
	let original = payload.message.clone();
	let message = augmentor.augment_or_passthrough(payload.message, &context).await;
	let augmented = original.is_some_and(|original| original != message);

	Json(AugmentResponse { message, augmented })
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			ServiceError::Unavailable { message } =>
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "RAG_UNAVAILABLE", message),
			ServiceError::Provider { message } => {
				tracing::error!(error = %message, "Embedding provider failed.");

				Self::new(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message)
			},
			ServiceError::Store { message } => {
				tracing::error!(error = %message, "Vector store failed.");

				Self::new(StatusCode::BAD_GATEWAY, "STORE_ERROR", message)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
