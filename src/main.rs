//! rechub - recording aggregation service entry point
//!
//! Serves the normalized recording listing over HTTP: live fetches against
//! the two upstream APIs, or synthesized demo data when so configured.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rechub::{build_router, config, AppState};

/// Command-line arguments for rechub
#[derive(Parser, Debug)]
#[command(name = "rechub")]
#[command(about = "Recording aggregation service: one canonical listing over two upstream APIs")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the configuration file)
    #[arg(short, long, env = "RECHUB_PORT")]
    port: Option<u16>,

    /// Path to the configuration file
    #[arg(short, long, env = "RECHUB_CONFIG")]
    config: Option<PathBuf>,

    /// Serve synthesized data by default; no upstream credentials needed
    #[arg(long, env = "RECHUB_DEMO")]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);

    let mut cfg = config::load(Some(&config_path)).context("Failed to load configuration")?;
    if args.demo {
        cfg.demo_mode = true;
    }
    let port = args.port.unwrap_or(cfg.port);

    // RUST_LOG wins; the configured level is the fallback
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("rechub={}", cfg.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rechub on port {}", port);
    info!(
        config = %config_path.display(),
        demo = cfg.demo_mode,
        "Configuration resolved"
    );

    if !cfg.demo_mode && !cfg.live_ready() {
        warn!(
            "Upstream credentials not fully configured; live fetches will fail. \
             Set them in {} or via RECHUB_API_BASE_URL, RECHUB_AUTH_BASE_URL, \
             RECHUB_ACCOUNT_ID, RECHUB_CLIENT_ID, RECHUB_CLIENT_SECRET.",
            config_path.display()
        );
    }

    let state = AppState::new(cfg).context("Failed to initialize application state")?;
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
