use axum::{
	Json, Router,
	extract::{Query, State, rejection::QueryRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use rix_domain::{FacetCounts, RoomSearchRequest, SearchResponse, SuggestionResponse};
use rix_service::{Error, HealthReport, HealthStatus};

#[derive(Debug, Default, Deserialize)]
struct SuggestionParams {
	#[serde(default)]
	q: Option<String>,
	#[serde(default)]
	limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();

		match err {
			Error::InvalidRequest { .. } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			Error::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, "not_found", message, None),
			Error::Index { .. } =>
				Self::new(StatusCode::BAD_GATEWAY, "index_unavailable", message, None),
			Error::Source { .. } =>
				Self::new(StatusCode::BAD_GATEWAY, "source_unavailable", message, None),
			Error::Decode { .. } => Self::new(StatusCode::BAD_GATEWAY, "decode_failed", message, None),
			Error::Timeout { .. } => Self::new(StatusCode::GATEWAY_TIMEOUT, "timeout", message, None),
		}
	}
}

impl From<QueryRejection> for ApiError {
	fn from(err: QueryRejection) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "invalid_request", err.body_text(), None)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/search/rooms", get(search_rooms))
		.route("/api/search/suggestions", get(suggestions))
		.route("/api/search/facets", get(facets))
		.with_state(state)
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
	let report = state.service.health().await;
	let status = match report.status {
		HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
		HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
	};

	(status, Json(report))
}

async fn search_rooms(
	State(state): State<AppState>,
	params: Result<Query<RoomSearchRequest>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let Query(request) = params?;
	let response = state.service.search(request).await?;

	Ok(Json(response))
}

async fn suggestions(
	State(state): State<AppState>,
	params: Result<Query<SuggestionParams>, QueryRejection>,
) -> Result<Json<SuggestionResponse>, ApiError> {
	let Query(params) = params?;
	let response =
		state.service.suggestions(params.q.as_deref().unwrap_or_default(), params.limit).await?;

	Ok(Json(response))
}

async fn facets(State(state): State<AppState>) -> Result<Json<FacetCounts>, ApiError> {
	let response = state.service.facets().await?;

	Ok(Json(response))
}
