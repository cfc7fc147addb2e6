//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub log_level: Level,
    /// Base URL of the auth provider (session collaborator).
    pub auth_url: String,
    /// Base URL of the object storage collaborator.
    pub storage_url: String,
    /// Bucket that document bytes are uploaded into.
    pub storage_bucket: String,
    /// Endpoint of the remote chat inference collaborator.
    pub inference_url: String,
    /// Endpoint of the remote embedding collaborator.
    pub embedding_url: String,
    /// Per-request timeout for the HTTP collaborators.
    pub request_timeout: Duration,
    /// Tick interval of the character-by-character answer reveal.
    pub reveal_interval: Duration,
    /// Whether the shell runs the placeholder processing pipeline that marks
    /// freshly uploaded documents ready after `processing_delay`.
    pub simulate_processing: bool,
    pub processing_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Remote collaborator endpoints ---
        // The originals hardcoded some of these; every one of them is
        // deployment configuration here.
        let auth_url = std::env::var("AUTH_URL")
            .unwrap_or_else(|_| "http://localhost:9999".to_string());
        let storage_url = std::env::var("STORAGE_URL")
            .unwrap_or_else(|_| "http://localhost:9000/storage/v1".to_string());
        let storage_bucket =
            std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "documents".to_string());
        let inference_url = std::env::var("INFERENCE_URL")
            .unwrap_or_else(|_| "http://localhost:8000/chat".to_string());
        let embedding_url = std::env::var("EMBEDDING_URL")
            .unwrap_or_else(|_| "http://localhost:8000/embed".to_string());

        let request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 30)?);
        let reveal_interval = Duration::from_millis(parse_var("REVEAL_INTERVAL_MS", 30)?);
        let simulate_processing = std::env::var("SIMULATE_PROCESSING")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        let processing_delay = Duration::from_millis(parse_var("PROCESSING_DELAY_MS", 1500)?);

        Ok(Self {
            database_url,
            log_level,
            auth_url,
            storage_url,
            storage_bucket,
            inference_url,
            embedding_url,
            request_timeout,
            reveal_interval,
            simulate_processing,
            processing_delay,
        })
    }
}

fn parse_var(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
