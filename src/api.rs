use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::csr::{self, Backend, ParseError, UnknownBackend};
use crate::models::{CsrDetailsModel, ErrorMessage};

pub const PARSER_HEADER: &str = "x-csr-parser";

pub struct ApiState {
    pub max_input_bytes: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct DecodeParams {
    pub parser: Option<String>,
}

/// Every failure the decode routes can produce. All of them render as the
/// same client-facing envelope; only the status code differs.
#[derive(Debug)]
pub enum ApiError {
    Decode(ParseError),
    Backend(UnknownBackend),
    Body(BytesRejection),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Decode(ParseError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Decode(e) => debug!(error = %e, "rejecting request"),
            ApiError::Backend(e) => debug!(error = %e, "rejecting request"),
            ApiError::Body(e) => debug!(error = %e, "failed to read request body"),
        }
        (self.status(), Json(ErrorMessage::invalid_csr())).into_response()
    }
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        ApiError::Decode(err)
    }
}

impl From<UnknownBackend> for ApiError {
    fn from(err: UnknownBackend) -> Self {
        ApiError::Backend(err)
    }
}

/// Query parameter first, then the header, then the default backend.
fn select_backend(params: &DecodeParams, headers: &HeaderMap) -> Result<Backend, UnknownBackend> {
    let header = headers
        .get(PARSER_HEADER)
        .map(|v| v.to_str().unwrap_or_default().to_string());
    match params.parser.clone().or(header) {
        Some(value) => Backend::from_str(&value),
        None => Ok(Backend::default()),
    }
}

fn decode_body(
    state: &ApiState,
    backend: Backend,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CsrDetailsModel>, ApiError> {
    let body = body.map_err(ApiError::Body)?;
    debug!(backend = %backend, len = body.len(), "decode request");
    let model = csr::decode(&body, backend, state.max_input_bytes)?;
    Ok(Json(model))
}

pub async fn handle_decode(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<DecodeParams>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CsrDetailsModel>, ApiError> {
    let backend = select_backend(&params, &headers)?;
    decode_body(&state, backend, body)
}

pub async fn handle_decode_custom(
    State(state): State<Arc<ApiState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<CsrDetailsModel>, ApiError> {
    decode_body(&state, Backend::Custom, body)
}

pub fn router(state: Arc<ApiState>) -> Router {
    let limit = state.max_input_bytes;
    Router::new()
        .route("/api/v1/csr", post(handle_decode))
        .route("/api/v1/csr-custom", post(handle_decode_custom))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}
