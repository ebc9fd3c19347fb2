//! Error types for the injection core.
//!
//! Errors split into two scopes: job-fatal errors (the volume itself cannot be
//! resolved, so no per-issue work ever starts) and issue-scoped errors, which
//! are recorded in the job's result list while the batch keeps going.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for longbox operations.
#[derive(Debug, Error)]
pub enum LongboxError {
    // Volume cache errors
    #[error("Volume not found: {volume_id}")]
    VolumeNotFound { volume_id: i64 },

    #[error("Volume {volume_id} has no issue at index {issue_index}")]
    IssueNotFound { volume_id: i64, issue_index: usize },

    // Resolver errors
    #[error("no match in catalog for {series} #{number}")]
    NoMatch { series: String, number: String },

    #[error("ambiguous catalog match for {series} #{number}: {candidates} tied candidates")]
    AmbiguousMatch {
        series: String,
        number: String,
        candidates: usize,
    },

    // Synthesizer errors
    #[error("Catalog record is incomplete: {reason}")]
    IncompleteMatch { reason: String },

    // Archive errors
    #[error("Cannot read archive {path:?}: {reason}")]
    ArchiveUnreadable { path: PathBuf, reason: String },

    #[error("No external tool available for {format} archives")]
    ArchiveToolUnavailable { format: String },

    #[error("Failed to rewrite archive {path:?}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    // Database errors
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("XML error: {message}")]
    Xml { message: String },

    // Job orchestration errors
    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("Operation cancelled")]
    Cancelled,

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for longbox operations.
pub type Result<T> = std::result::Result<T, LongboxError>;

impl From<std::io::Error> for LongboxError {
    fn from(err: std::io::Error) -> Self {
        LongboxError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for LongboxError {
    fn from(err: serde_json::Error) -> Self {
        LongboxError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for LongboxError {
    fn from(err: rusqlite::Error) -> Self {
        LongboxError::Database {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for LongboxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LongboxError::Timeout(std::time::Duration::from_secs(0))
        } else {
            LongboxError::Network {
                message: err.to_string(),
                cause: Some(err.to_string()),
            }
        }
    }
}

impl LongboxError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LongboxError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create an XML error from any displayable cause.
    pub fn xml(err: impl std::fmt::Display) -> Self {
        LongboxError::Xml {
            message: err.to_string(),
        }
    }

    /// Check whether this error is scoped to a single issue.
    ///
    /// Issue-scoped errors become failed `InjectionResult` entries; everything
    /// else aborts the job before any per-issue attempt.
    pub fn is_issue_scoped(&self) -> bool {
        matches!(
            self,
            LongboxError::IssueNotFound { .. }
                | LongboxError::NoMatch { .. }
                | LongboxError::AmbiguousMatch { .. }
                | LongboxError::IncompleteMatch { .. }
                | LongboxError::ArchiveUnreadable { .. }
                | LongboxError::ArchiveToolUnavailable { .. }
                | LongboxError::WriteFailed { .. }
        )
    }
}
