//! Error types for Pressline.
//!
//! Library crates use [`PresslineError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Pressline operations.
#[derive(Debug, thiserror::Error)]
pub enum PresslineError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The queue header row lacks one or more required columns.
    #[error("queue schema error: missing required column(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    /// No content items were discovered under the content root.
    #[error("no content found under {}", root.display())]
    NoContent { root: PathBuf },

    /// A rollup document lacks a start/end marker (or they are out of order).
    #[error("marker missing in {}: {marker}", document.display())]
    MarkerMissing { document: PathBuf, marker: String },

    /// Remote task queue failure.
    #[error("queue error: {message}")]
    Queue { message: String, transient: bool },

    /// Version-control command failure.
    #[error("vcs error: {0}")]
    Vcs(String),

    /// Generator subprocess failure.
    #[error("generation error: {0}")]
    Generation(String),

    /// A run precondition does not hold (dirty tree, wrong branch, ...).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad date, bad JSON, ...).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A pipeline stage failed after the batch was committed to disk.
    /// `status_report` describes the independent queue write-back outcome.
    #[error("{stage} failed: {message} (status report: {status_report})")]
    Stage {
        stage: String,
        message: String,
        status_report: String,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PresslineError>;

impl PresslineError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a queue error that is worth retrying.
    pub fn queue_transient(msg: impl Into<String>) -> Self {
        Self::Queue {
            message: msg.into(),
            transient: true,
        }
    }

    /// Create a queue error that retrying will not fix (4xx, bad payload).
    pub fn queue_fatal(msg: impl Into<String>) -> Self {
        Self::Queue {
            message: msg.into(),
            transient: false,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a retry may succeed where this attempt failed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Queue { transient, .. } => *transient,
            Self::Vcs(_) | Self::Generation(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PresslineError::config("missing SEO_SHEET_ID");
        assert_eq!(err.to_string(), "config error: missing SEO_SHEET_ID");

        let err = PresslineError::Schema {
            missing: vec!["slug".into(), "status".into()],
        };
        assert_eq!(
            err.to_string(),
            "queue schema error: missing required column(s): slug, status"
        );
    }

    #[test]
    fn transient_classification() {
        assert!(PresslineError::queue_transient("HTTP 503").is_transient());
        assert!(!PresslineError::queue_fatal("HTTP 403").is_transient());
        assert!(PresslineError::Generation("exit 1".into()).is_transient());
        assert!(!PresslineError::Precondition("dirty tree".into()).is_transient());
        assert!(!PresslineError::Schema { missing: vec![] }.is_transient());
    }
}
