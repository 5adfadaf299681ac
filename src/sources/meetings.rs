//! Meeting recording source
//!
//! The meetings upstream aggregates server-side and answers a date range with
//! one payload of sessions, each embedding zero or more file descriptors. The
//! payload is loosely shaped: host identity appears under several different
//! field names, sizes arrive as numbers or junk strings, timestamps may be
//! invalid. Normalization resolves each field through an ordered fallback
//! chain and absorbs malformed values instead of raising on them.

use super::{FetchRange, RecordingSource, SourceBatch, SourceError};
use crate::auth::TokenProvider;
use crate::models::{Owner, Recording, Site, SourceKind};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = "rechub/0.1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-aggregated response for one date range
#[derive(Debug, Deserialize)]
struct MeetingsPayload {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    meetings: Vec<MeetingSession>,
}

/// One logical session as the upstream reports it
///
/// Every identity field is optional and the same datum can arrive under a
/// camel-case or snake-case name depending on the upstream code path that
/// produced it. The session `id` is kept as raw JSON since it shows up both
/// numeric and stringly.
#[derive(Debug, Default, Deserialize)]
struct MeetingSession {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    duration: i64,
    #[serde(default)]
    host_id: Option<String>,
    #[serde(rename = "hostEmail", default)]
    host_email_camel: Option<String>,
    #[serde(default)]
    host_email: Option<String>,
    #[serde(default)]
    owner_email: Option<String>,
    #[serde(rename = "hostName", default)]
    host_name_camel: Option<String>,
    #[serde(default)]
    owner_name: Option<String>,
    #[serde(default)]
    recording_files: Vec<MeetingFile>,
    #[serde(rename = "autoDelete", default)]
    auto_delete: Option<bool>,
    #[serde(rename = "autoDeleteDate", default)]
    auto_delete_date: Option<String>,
}

/// Embedded file descriptor
#[derive(Debug, Default, Deserialize)]
struct MeetingFile {
    #[serde(default)]
    recording_start: Option<String>,
    /// Number upstream on good days, junk string or null otherwise
    #[serde(default)]
    file_size: Value,
    #[serde(default)]
    file_type: Option<String>,
}

/// First candidate that is present and non-empty
fn first_non_empty<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .flatten()
        .find(|value| !value.is_empty())
}

/// Lenient timestamp parse for ordering file starts
///
/// Accepts full RFC 3339 and the upstream's seconds-less `…THH:MMZ` variant.
fn parse_start(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

/// Earliest parseable file start, returned as its original upstream string
fn earliest_file_start(files: &[MeetingFile]) -> Option<String> {
    files
        .iter()
        .filter_map(|file| file.recording_start.as_deref())
        .filter_map(|raw| parse_start(raw).map(|at| (at, raw)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, raw)| raw.to_string())
}

/// Size of one file in bytes, zero for anything non-numeric or non-finite
fn coerce_size(value: &Value) -> u64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|size| size.is_finite()).unwrap_or(0.0) as u64
}

/// Non-empty file types, deduplicated, first-seen order
fn distinct_file_types(files: &[MeetingFile]) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for file in files {
        if let Some(file_type) = file.file_type.as_deref() {
            if !file_type.is_empty() && !types.iter().any(|seen| seen == file_type) {
                types.push(file_type.to_string());
            }
        }
    }
    types
}

/// Session identifier: uuid when present, else the numeric id as a string
fn resolve_id(uuid: Option<&str>, id: Option<&Value>) -> String {
    if let Some(uuid) = uuid {
        if !uuid.is_empty() {
            return uuid.to_string();
        }
    }
    match id {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => String::new(),
    }
}

impl MeetingSession {
    /// Host email chain: `hostEmail`, `host_email`, `owner_email`, empty
    fn resolved_host_email(&self) -> String {
        first_non_empty(&[
            self.host_email_camel.as_deref(),
            self.host_email.as_deref(),
            self.owner_email.as_deref(),
        ])
        .unwrap_or("")
        .to_string()
    }

    /// Host display name chain: `hostName`, `owner_name`, the resolved email,
    /// the topic, then the literal "Unknown"; never empty.
    fn resolved_host_name(&self, email: &str) -> String {
        first_non_empty(&[
            self.host_name_camel.as_deref(),
            self.owner_name.as_deref(),
            Some(email),
            self.topic.as_deref(),
        ])
        .unwrap_or("Unknown")
        .to_string()
    }
}

/// Reconcile one session into canonical form
fn normalize_session(session: MeetingSession) -> Recording {
    let email = session.resolved_host_email();
    let name = session.resolved_host_name(&email);

    // Per-file starts are finer than the session-level one, so the earliest
    // valid file start wins and the session start is only a fallback.
    let date_time = earliest_file_start(&session.recording_files)
        .or_else(|| session.start_time.clone())
        .unwrap_or_default();

    let file_size: u64 = session
        .recording_files
        .iter()
        .map(|file| coerce_size(&file.file_size))
        .sum();
    let files_types = distinct_file_types(&session.recording_files);

    let callee_name = if email.is_empty() {
        name.clone()
    } else {
        email.clone()
    };

    Recording {
        id: resolve_id(session.uuid.as_deref(), session.id.as_ref()),
        source: SourceKind::Meetings,
        date_time,
        duration: session.duration,
        caller_name: session.topic.clone().unwrap_or_default(),
        callee_name,
        owner: Owner::user(session.host_id.clone().unwrap_or_default(), name),
        site: Site::placeholder(),
        download_url: None,
        topic: session.topic,
        host_email: Some(email),
        file_size: Some(file_size),
        files_count: Some(session.recording_files.len()),
        files_types: Some(files_types),
        auto_delete: session.auto_delete,
        auto_delete_date: session.auto_delete_date,
    }
}

/// Client for the server-aggregated meetings upstream
pub struct MeetingsSource {
    http: reqwest::Client,
    api_base_url: String,
    tokens: Arc<TokenProvider>,
}

impl MeetingsSource {
    pub fn new(
        api_base_url: impl Into<String>,
        tokens: Arc<TokenProvider>,
    ) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_base_url: api_base_url.into(),
            tokens,
        })
    }
}

#[async_trait::async_trait]
impl RecordingSource for MeetingsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Meetings
    }

    /// One request covers the whole range; no pagination on this path
    async fn fetch(&self, range: FetchRange, page_size: u32) -> Result<SourceBatch, SourceError> {
        let token = self.tokens.bearer().await?;
        let url = format!("{}/meetings/recordings", self.api_base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[
                ("from", range.from_str()),
                ("to", range.to_str()),
                ("page_size", page_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(status.as_u16(), error_text));
        }

        let payload: MeetingsPayload = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let from = payload.from.unwrap_or_else(|| range.from_str());
        let to = payload.to.unwrap_or_else(|| range.to_str());
        let recordings: Vec<Recording> = payload
            .meetings
            .into_iter()
            .map(normalize_session)
            .collect();

        tracing::debug!(records = recordings.len(), "Fetched meeting recordings");

        Ok(SourceBatch {
            from,
            to,
            recordings,
        })
    }
}
