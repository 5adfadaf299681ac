//! Download relay endpoint
//!
//! Upstream download URLs require the bearer token, which never leaves this
//! service. The relay fetches the file with the token attached and streams
//! the bytes back. Only URLs under the configured upstream API base are
//! relayed; anything else is refused outright.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::sources::SourceError;
use crate::AppState;

/// Query parameters for GET /api/download
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// Upstream file URL
    pub url: String,
}

/// True when `url` sits under `base` (next segment boundary respected, so a
/// base of `…/v2` does not admit `…/v2evil`)
fn relay_allowed(base: &str, url: &str) -> bool {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return false;
    }
    match url.strip_prefix(base) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

/// GET /api/download?url=…
pub async fn relay_download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<Response> {
    if !relay_allowed(&state.config.upstream.api_base_url, &query.url) {
        return Err(ApiError::BadRequest(format!(
            "Refusing to relay '{}': not under the configured upstream",
            query.url
        )));
    }

    let token = state.tokens.bearer().await.map_err(SourceError::from)?;

    let upstream = state
        .relay
        .get(&query.url)
        .bearer_auth(&token)
        .send()
        .await
        .map_err(|e| SourceError::Network(e.to_string()))?;

    let status = upstream.status();

    if !status.is_success() {
        let body = upstream.text().await.unwrap_or_default();
        return Err(ApiError::Upstream(SourceError::Api(status.as_u16(), body)));
    }

    // reqwest and axum sit on different `http` major versions, so header
    // values cross over as strings.
    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let disposition = upstream
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let bytes = upstream
        .bytes()
        .await
        .map_err(|e| SourceError::Network(e.to_string()))?;

    tracing::debug!(url = %query.url, bytes = bytes.len(), "Relayed download");

    let mut builder = Response::builder().status(StatusCode::OK);
    if let Some(value) = content_type {
        builder = builder.header(header::CONTENT_TYPE, value);
    }
    if let Some(value) = disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, value);
    }

    builder
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Build download routes
pub fn download_routes() -> Router<AppState> {
    Router::new().route("/api/download", get(relay_download))
}
