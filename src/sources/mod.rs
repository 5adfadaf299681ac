//! Upstream recording sources
//!
//! The two live upstreams are structurally different: the phone upstream is
//! cursor-paginated and must be walked page by page, while the meetings
//! upstream returns one server-aggregated response per date range. Both are
//! exposed through the single `RecordingSource` capability so the fetch
//! orchestrator depends on the interface, never on which concrete source the
//! caller selected.

pub mod meetings;
pub mod phone;

pub use meetings::MeetingsSource;
pub use phone::PhoneSource;

use crate::auth::TokenError;
use crate::models::{Recording, SourceKind};
use chrono::NaiveDate;
use thiserror::Error;

/// Date range of a fetch, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl FetchRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Request-parameter form of the start date (`YYYY-MM-DD`)
    pub fn from_str(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    /// Request-parameter form of the end date (`YYYY-MM-DD`)
    pub fn to_str(&self) -> String {
        self.to.format("%Y-%m-%d").to_string()
    }
}

/// Normalized output of one source fetch
///
/// `from`/`to` are the upstream-echoed range bounds, falling back to the
/// request values when the upstream omits them.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBatch {
    pub from: String,
    pub to: String,
    pub recordings: Vec<Recording>,
}

/// Source fetch errors
///
/// There is deliberately no finer classification of upstream failures: a
/// non-2xx response surfaces as `Api` with the status code and raw body text,
/// and the orchestrator is the sole recovery boundary.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

/// Capability interface over the live upstreams
///
/// `fetch` resolves the whole date range in one call: pagination, when the
/// upstream needs it, happens inside the implementation and is never exposed
/// to the caller. Failure is atomic: an error on any page discards everything
/// already accumulated.
#[async_trait::async_trait]
pub trait RecordingSource: Send + Sync {
    /// Provenance tag this source stamps on its records
    fn kind(&self) -> SourceKind;

    /// Fetch and normalize every recording in the range
    async fn fetch(&self, range: FetchRange, page_size: u32) -> Result<SourceBatch, SourceError>;
}
