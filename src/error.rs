//! Error types for the flood event tracker.

use thiserror::Error;

use crate::db::DbConfigError;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can abort a tracker run.
///
/// Segmentation and reconciliation never fail; apart from the two
/// numbering guards, everything here comes from configuration or a
/// collaborator boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or setup problem.
    #[error(transparent)]
    DbConfig(#[from] DbConfigError),

    /// PostgreSQL query error.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] postgres::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from a remote API.
    #[error("{service} API error: HTTP {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error.
    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Required environment variable not set.
    #[error("Environment variable {0} not set")]
    MissingEnv(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A site's log already holds numbers too close to `u32::MAX` to
    /// number its new events.
    #[error("Event numbers exhausted for {site}: logged maximum is {existing_max}")]
    EventNumbersExhausted { site: String, existing_max: u32 },

    /// Site workers panicked; their events were not produced.
    #[error("{0} site worker(s) panicked")]
    WorkerPanic(usize),

    /// Malformed payload from a collaborator.
    #[error("Parse error: {0}")]
    Parse(String),
}
