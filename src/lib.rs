//! rechub library interface
//!
//! Exposes the fetch engine and the HTTP router for integration testing.

pub mod api;
pub mod auth;
pub mod config;
pub mod demo;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod sources;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

use crate::auth::TokenProvider;
use crate::config::TomlConfig;
use crate::error::{Error, Result};
use crate::orchestrator::FetchOrchestrator;
use crate::sources::{MeetingsSource, PhoneSource, RecordingSource};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved service configuration
    pub config: Arc<TomlConfig>,
    /// Fetch state machine over both upstream sources
    pub orchestrator: Arc<FetchOrchestrator>,
    /// Upstream bearer token cache, shared by sources and the relay
    pub tokens: Arc<TokenProvider>,
    /// HTTP client for the download relay
    pub relay: reqwest::Client,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: TomlConfig) -> Result<Self> {
        let config = Arc::new(config);
        let upstream = &config.upstream;

        let tokens = Arc::new(
            TokenProvider::new(
                upstream.auth_base_url.clone(),
                upstream.account_id.clone(),
                upstream.client_id.clone(),
                upstream.client_secret.clone(),
            )
            .map_err(|e| Error::Internal(e.to_string()))?,
        );

        let phone: Arc<dyn RecordingSource> = Arc::new(
            PhoneSource::new(upstream.api_base_url.clone(), tokens.clone())
                .map_err(|e| Error::Internal(e.to_string()))?,
        );
        let meetings: Arc<dyn RecordingSource> = Arc::new(
            MeetingsSource::new(upstream.api_base_url.clone(), tokens.clone())
                .map_err(|e| Error::Internal(e.to_string()))?,
        );

        let relay = reqwest::Client::builder()
            .user_agent("rechub/0.1.0")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(Self {
            config,
            orchestrator: Arc::new(FetchOrchestrator::new(phone, meetings)),
            tokens,
            relay,
            startup_time: Utc::now(),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::recordings_routes())
        .merge(api::download_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
