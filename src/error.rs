//! Typed errors for the harvesting engine.
//!
//! Per-card and per-fragment problems never show up here: they degrade to
//! the `N/A` sentinel or a skipped card. Only fetch failures (retried),
//! session acquisition, configuration and sink failures are typed.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::controller::RunOutcome;

/// Transient failure while producing one page snapshot.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Readiness condition not reached in time
    #[error("page not ready after {waited:?}: {url}")]
    LoadTimeout { url: String, waited: Duration },

    /// Navigation (or click-to-advance) failed
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The session rejected a scroll/content/size request
    #[error("session error: {0}")]
    Session(String),
}

/// The browser session could not be started.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch session: {0}")]
    Launch(String),
}

/// Errors writing accumulated records.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Caller asked for a format we do not write
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(String),
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Top-level errors surfaced by [`crate::harvest`].
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The run finished but its records could not be written. The records
    /// are still available in `outcome`.
    #[error("failed to persist {} records: {source}", outcome.records.len())]
    Persist {
        #[source]
        source: SinkError,
        outcome: RunOutcome,
    },
}
