//! Configuration resolution for rechub
//!
//! Multi-tier priority:
//! 1. Command-line arguments (--port, --config, --demo)
//! 2. Environment variables (RECHUB_*)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! Upstream credentials are deployment secrets, so the environment tier
//! matters most for them; everything else usually lives in the TOML file.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default HTTP server port
pub const DEFAULT_PORT: u16 = 5780;

/// Service configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: u16,

    /// Serve synthesized data when the request does not say otherwise
    pub demo_mode: bool,

    /// Page size requested from the upstreams when the caller omits one
    pub page_size: u32,

    /// Live upstream endpoints and credentials
    pub upstream: UpstreamConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            demo_mode: false,
            page_size: 30,
            upstream: UpstreamConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Upstream API endpoints and account credentials
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the recordings API
    pub api_base_url: String,

    /// Base URL of the token-issuing endpoint
    pub auth_base_url: String,

    /// Account the credentials belong to
    pub account_id: String,

    pub client_id: String,
    pub client_secret: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// True when every field a live upstream fetch needs is set
    pub fn live_ready(&self) -> bool {
        let u = &self.upstream;
        [
            &u.api_base_url,
            &u.auth_base_url,
            &u.account_id,
            &u.client_id,
            &u.client_secret,
        ]
        .iter()
        .all(|value| !value.trim().is_empty())
    }

    /// Overlay RECHUB_* environment variables onto the file values
    fn apply_env(&mut self) {
        overlay(&mut self.upstream.api_base_url, "RECHUB_API_BASE_URL");
        overlay(&mut self.upstream.auth_base_url, "RECHUB_AUTH_BASE_URL");
        overlay(&mut self.upstream.account_id, "RECHUB_ACCOUNT_ID");
        overlay(&mut self.upstream.client_id, "RECHUB_CLIENT_ID");
        overlay(&mut self.upstream.client_secret, "RECHUB_CLIENT_SECRET");
    }
}

fn overlay(slot: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.trim().is_empty() {
            *slot = value;
        }
    }
}

/// Default configuration file location (`~/.config/rechub/config.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("rechub").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("rechub.toml"))
}

/// Load configuration from `path`, or from the default location
///
/// A missing file is not an error: built-in defaults apply and the
/// environment tier can still fill in the upstream credentials. This runs
/// before tracing is initialized (the log filter comes from the loaded
/// config), so it stays quiet and the caller reports the outcome.
pub fn load(path: Option<&Path>) -> Result<TomlConfig> {
    let resolved = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);

    let mut config = if resolved.exists() {
        let content = std::fs::read_to_string(&resolved)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?
    } else {
        TomlConfig::default()
    };

    config.apply_env();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_toml() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.demo_mode);
        assert_eq!(config.page_size, 30);
        assert_eq!(config.logging.level, "info");
        assert!(!config.live_ready());
    }

    #[test]
    fn full_toml_parses() {
        let config: TomlConfig = toml::from_str(
            r#"
            port = 8080
            demo_mode = true
            page_size = 100

            [upstream]
            api_base_url = "https://api.example.test/v2"
            auth_base_url = "https://auth.example.test"
            account_id = "acct_1"
            client_id = "cid"
            client_secret = "shh"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert!(config.demo_mode);
        assert_eq!(config.page_size, 100);
        assert_eq!(config.upstream.account_id, "acct_1");
        assert_eq!(config.logging.level, "debug");
        assert!(config.live_ready());
    }

    #[test]
    fn partial_upstream_is_not_live_ready() {
        let config: TomlConfig = toml::from_str(
            r#"
            [upstream]
            api_base_url = "https://api.example.test/v2"
            client_id = "cid"
            "#,
        )
        .unwrap();
        assert!(!config.live_ready());
    }

    #[test]
    fn load_reads_file_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = 6001\n").unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.port, 6001);
    }

    #[test]
    fn load_falls_back_to_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        let err = load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Parse TOML failed"));
    }
}
