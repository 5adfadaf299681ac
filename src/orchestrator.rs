//! Fetch orchestration state machine
//!
//! One orchestrator instance owns the visible fetch state for the process:
//! idle, loading, success with a result envelope, or error with a message.
//! Every fetch moves through loading and lands on exactly one terminal phase.
//! Demo mode takes absolute precedence over source selection and never
//! touches the network; live mode dispatches to exactly one source.
//!
//! Concurrent fetches are not interlocked. Each invocation takes a ticket
//! from a monotonic counter and only the newest ticket may publish its
//! outcome, so a slow superseded fetch cannot overwrite the state a later
//! fetch already produced. The superseded caller still receives its own
//! outcome directly.

use crate::demo;
use crate::models::{RecordingsEnvelope, SourceKind};
use crate::sources::{FetchRange, RecordingSource, SourceError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Phase of the most recent fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    Idle,
    Loading,
    Success,
    Error,
}

/// Published fetch state, snapshotted by the state endpoint
///
/// `result` survives a later failed fetch: stale data stays visible next to
/// the error message until a fetch succeeds again.
#[derive(Debug, Clone, Serialize)]
pub struct FetchState {
    pub phase: FetchPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RecordingsEnvelope>,
}

impl Default for FetchState {
    fn default() -> Self {
        Self {
            phase: FetchPhase::Idle,
            error: None,
            result: None,
        }
    }
}

impl FetchState {
    fn transition(&mut self, phase: FetchPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "Fetch phase transition");
        self.phase = phase;
    }
}

/// One fetch invocation's parameters
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest {
    pub source: SourceKind,
    pub range: FetchRange,
    pub page_size: u32,
    pub demo_mode: bool,
}

/// Drives fetches and owns the published state
pub struct FetchOrchestrator {
    phone: Arc<dyn RecordingSource>,
    meetings: Arc<dyn RecordingSource>,
    state: RwLock<FetchState>,
    seq: AtomicU64,
}

impl FetchOrchestrator {
    pub fn new(phone: Arc<dyn RecordingSource>, meetings: Arc<dyn RecordingSource>) -> Self {
        Self {
            phone,
            meetings,
            state: RwLock::new(FetchState::default()),
            seq: AtomicU64::new(0),
        }
    }

    /// Snapshot of the published state
    pub async fn state(&self) -> FetchState {
        self.state.read().await.clone()
    }

    /// Run one fetch and publish its outcome
    ///
    /// The caller always gets this invocation's own result, even when a newer
    /// fetch superseded it in the published state.
    pub async fn fetch(
        &self,
        request: FetchRequest,
    ) -> Result<RecordingsEnvelope, SourceError> {
        let ticket = self.seq.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            source = %request.source,
            from = %request.range.from_str(),
            to = %request.range.to_str(),
            demo = request.demo_mode,
            "Fetch requested"
        );

        {
            let mut state = self.state.write().await;
            // Skip the transition when a newer fetch already took a ticket;
            // that fetch owns the published state from here on.
            if ticket == self.seq.load(Ordering::SeqCst) {
                state.transition(FetchPhase::Loading);
                state.error = None;
            }
        }

        let outcome = self.dispatch(&request).await;

        let mut state = self.state.write().await;
        if ticket != self.seq.load(Ordering::SeqCst) {
            // A newer fetch was issued while this one ran; its outcome owns
            // the published state now.
            tracing::debug!(ticket, "Discarding superseded fetch outcome");
            return outcome;
        }

        match &outcome {
            Ok(envelope) => {
                state.transition(FetchPhase::Success);
                state.result = Some(envelope.clone());
                state.error = None;
            }
            Err(err) => {
                state.transition(FetchPhase::Error);
                state.error = Some(err.to_string());
                tracing::warn!(error = %err, "Fetch failed");
            }
        }

        outcome
    }

    async fn dispatch(&self, request: &FetchRequest) -> Result<RecordingsEnvelope, SourceError> {
        if request.demo_mode {
            let recordings = demo::generate(request.range);
            tracing::info!(records = recordings.len(), "Generated demo recordings");
            return Ok(RecordingsEnvelope::wrap(
                request.range.from_str(),
                request.range.to_str(),
                recordings,
            ));
        }

        let source = match request.source {
            SourceKind::Phone => &self.phone,
            SourceKind::Meetings => &self.meetings,
        };
        tracing::debug!(source = %source.kind(), "Dispatching to live source");

        let batch = source.fetch(request.range, request.page_size).await?;
        Ok(RecordingsEnvelope::wrap(
            batch.from,
            batch.to,
            batch.recordings,
        ))
    }
}
