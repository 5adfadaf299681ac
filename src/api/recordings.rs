//! Recording listing endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::{RecordingsEnvelope, SourceKind};
use crate::orchestrator::{FetchRequest, FetchState};
use crate::sources::FetchRange;
use crate::AppState;

/// Query parameters for GET /api/recordings
#[derive(Debug, Default, Deserialize)]
pub struct RecordingsQuery {
    /// Source filter, `phone` (default) or `meetings`
    pub source: Option<String>,
    /// Range start, `YYYY-MM-DD`; defaults to seven days before `to`
    pub from: Option<String>,
    /// Range end, `YYYY-MM-DD`; defaults to today
    pub to: Option<String>,
    /// Upstream page size; defaults to the configured value
    pub page_size: Option<u32>,
    /// Demo-mode override; defaults to the configured value
    pub demo: Option<bool>,
}

fn parse_source(raw: Option<&str>) -> ApiResult<SourceKind> {
    match raw {
        None | Some("phone") => Ok(SourceKind::Phone),
        Some("meetings") => Ok(SourceKind::Meetings),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Unknown source '{}', expected 'phone' or 'meetings'",
            other
        ))),
    }
}

fn parse_date(raw: &str, field: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::BadRequest(format!(
            "Invalid '{}' date '{}', expected YYYY-MM-DD",
            field, raw
        ))
    })
}

fn resolve_range(query: &RecordingsQuery) -> ApiResult<FetchRange> {
    let to = match query.to.as_deref() {
        Some(raw) => parse_date(raw, "to")?,
        None => Utc::now().date_naive(),
    };
    let from = match query.from.as_deref() {
        Some(raw) => parse_date(raw, "from")?,
        None => to.checked_sub_days(Days::new(7)).unwrap_or(to),
    };

    if from > to {
        return Err(ApiError::BadRequest(format!(
            "Range start {} is after range end {}",
            from, to
        )));
    }

    Ok(FetchRange::new(from, to))
}

/// GET /api/recordings
///
/// Runs one fetch through the orchestrator and returns the result envelope.
/// Upstream failures surface as 502 with the upstream's status and body in
/// the message.
pub async fn list_recordings(
    State(state): State<AppState>,
    Query(query): Query<RecordingsQuery>,
) -> ApiResult<Json<RecordingsEnvelope>> {
    let source = parse_source(query.source.as_deref())?;
    let range = resolve_range(&query)?;

    let request = FetchRequest {
        source,
        range,
        page_size: query.page_size.unwrap_or(state.config.page_size),
        demo_mode: query.demo.unwrap_or(state.config.demo_mode),
    };

    let envelope = state.orchestrator.fetch(request).await?;
    Ok(Json(envelope))
}

/// GET /api/recordings/state
///
/// Snapshot of the orchestrator's published state, stale result included.
pub async fn fetch_state(State(state): State<AppState>) -> Json<FetchState> {
    Json(state.orchestrator.state().await)
}

/// Build recording routes
pub fn recordings_routes() -> Router<AppState> {
    Router::new()
        .route("/api/recordings", get(list_recordings))
        .route("/api/recordings/state", get(fetch_state))
}
