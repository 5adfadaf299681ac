//! Phone recording source
//!
//! The phone upstream returns call recordings in cursor-paginated pages. A
//! fetch walks the cursor chain until the upstream stops returning a token,
//! accumulating records in arrival order, and reports the whole range as one
//! batch. Records arrive close to canonical form already; normalization here
//! is the `phone` provenance tag plus field passthrough.

use super::{FetchRange, RecordingSource, SourceBatch, SourceError};
use crate::auth::TokenProvider;
use crate::models::{Owner, Recording, Site, SourceKind};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Upstream hard cap on `page_size`; larger requests are clamped before send
pub const MAX_PAGE_SIZE: u32 = 300;

/// Ceiling on the number of pages walked for one range
pub const MAX_PAGES: usize = 20;

/// The upstream filters the range on recording start time
const QUERY_DATE_TYPE: &str = "start_time";

const USER_AGENT: &str = "rechub/0.1.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One page of the upstream listing
#[derive(Debug, Deserialize)]
struct PhonePage {
    /// Effective range start as the upstream resolved it
    #[serde(default)]
    from: Option<String>,
    /// Effective range end as the upstream resolved it
    #[serde(default)]
    to: Option<String>,
    /// Cursor for the next page; absent or empty when exhausted
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    recordings: Vec<PhoneRecording>,
}

/// Wire form of one call recording
#[derive(Debug, Deserialize)]
struct PhoneRecording {
    #[serde(default)]
    id: String,
    #[serde(default)]
    caller_name: String,
    #[serde(default)]
    callee_name: String,
    #[serde(default)]
    date_time: String,
    #[serde(default)]
    duration: i64,
    #[serde(default)]
    owner: Option<Owner>,
    #[serde(default)]
    site: Option<Site>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(rename = "autoDelete", default)]
    auto_delete: Option<bool>,
    #[serde(rename = "autoDeleteDate", default)]
    auto_delete_date: Option<String>,
}

impl PhoneRecording {
    fn into_recording(self) -> Recording {
        Recording {
            id: self.id,
            source: SourceKind::Phone,
            date_time: self.date_time,
            duration: self.duration,
            caller_name: self.caller_name,
            callee_name: self.callee_name,
            owner: self.owner.unwrap_or_default(),
            site: self.site.unwrap_or_default(),
            download_url: self.download_url,
            topic: None,
            host_email: None,
            file_size: None,
            files_count: None,
            files_types: None,
            auto_delete: self.auto_delete,
            auto_delete_date: self.auto_delete_date,
        }
    }
}

/// Client for the cursor-paginated phone upstream
pub struct PhoneSource {
    http: reqwest::Client,
    api_base_url: String,
    tokens: Arc<TokenProvider>,
}

impl PhoneSource {
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

    async fn fetch_page(
        &self,
        range: FetchRange,
        page_size: u32,
        cursor: Option<&str>,
    ) -> Result<PhonePage, SourceError> {
        let token = self.tokens.bearer().await?;
        let url = format!("{}/phone/recordings", self.api_base_url);

        let mut request = self.http.get(&url).bearer_auth(&token).query(&[
            ("page_size", page_size.to_string()),
            ("from", range.from_str()),
            ("to", range.to_str()),
            ("query_date_type", QUERY_DATE_TYPE.to_string()),
        ]);

        if let Some(cursor) = cursor {
            request = request.query(&[("next_page_token", cursor)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(status.as_u16(), error_text));
        }

        response
            .json::<PhonePage>()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl RecordingSource for PhoneSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Phone
    }

    /// Walk the cursor chain and return the concatenated range
    ///
    /// The echoed `from`/`to` come from the first page; later pages repeat
    /// them. An empty-string cursor counts as exhaustion. Any page failing
    /// fails the whole fetch, including records already collected.
    async fn fetch(&self, range: FetchRange, page_size: u32) -> Result<SourceBatch, SourceError> {
        let page_size = page_size.min(MAX_PAGE_SIZE);

        let mut recordings = Vec::new();
        let mut echoed: Option<(String, String)> = None;
        let mut cursor: Option<String> = None;
        let mut exhausted = false;

        for page_index in 0..MAX_PAGES {
            let page = self.fetch_page(range, page_size, cursor.as_deref()).await?;

            if echoed.is_none() {
                echoed = Some((
                    page.from.clone().unwrap_or_else(|| range.from_str()),
                    page.to.clone().unwrap_or_else(|| range.to_str()),
                ));
            }

            tracing::debug!(
                page = page_index + 1,
                records = page.recordings.len(),
                "Fetched phone recordings page"
            );

            recordings.extend(
                page.recordings
                    .into_iter()
                    .map(PhoneRecording::into_recording),
            );

            cursor = page.next_page_token.filter(|token| !token.is_empty());
            if cursor.is_none() {
                exhausted = true;
                break;
            }
        }

        if !exhausted {
            tracing::warn!(
                pages = MAX_PAGES,
                records = recordings.len(),
                "Phone pagination cap reached, returning collected pages"
            );
        }

        let (from, to) = echoed.unwrap_or_else(|| (range.from_str(), range.to_str()));

        Ok(SourceBatch {
            from,
            to,
            recordings,
        })
    }
}
