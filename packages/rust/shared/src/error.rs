//! Error types for WikiTrigger.
//!
//! Library crates use [`WikiTriggerError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Variants fall into two classes:
//! - item/cursor level ([`MalformedItem`](WikiTriggerError::MalformedItem),
//!   [`InvalidCursor`](WikiTriggerError::InvalidCursor)): the engine recovers
//!   and keeps evaluating the trigger;
//! - request level (everything else): the whole evaluation fails and no
//!   partial response is produced.

use std::path::PathBuf;

use crate::types::TriggerKind;

/// Top-level error type for all WikiTrigger operations.
#[derive(Debug, thiserror::Error)]
pub enum WikiTriggerError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Upstream wiki fetch failed (network, HTTP status, unreadable body).
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A single raw feed item could not be normalized.
    #[error("malformed {kind} item: {reason}")]
    MalformedItem { kind: TriggerKind, reason: String },

    /// A caller-supplied cursor failed structural validation.
    #[error("invalid cursor: {reason}")]
    InvalidCursor { reason: String },

    /// The requested response limit is not a positive integer.
    #[error("invalid limit {limit}: must be greater than zero")]
    InvalidLimit { limit: i64 },

    /// Caller input validation error (unknown kind, missing trigger field, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, WikiTriggerError>;

impl WikiTriggerError {
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

    /// Create a malformed-item error for the given trigger kind.
    pub fn malformed(kind: TriggerKind, reason: impl Into<String>) -> Self {
        Self::MalformedItem {
            kind,
            reason: reason.into(),
        }
    }

    /// Create an invalid-cursor error.
    pub fn invalid_cursor(reason: impl Into<String>) -> Self {
        Self::InvalidCursor {
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the caller should retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SourceUnavailable(_))
    }

    /// Whether the error was caused by the caller's input.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidLimit { .. } | Self::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = WikiTriggerError::config("bad toml");
        assert_eq!(err.to_string(), "config error: bad toml");

        let err = WikiTriggerError::malformed(TriggerKind::HashtagEdit, "missing timestamp");
        assert_eq!(
            err.to_string(),
            "malformed new_hashtag item: missing timestamp"
        );

        let err = WikiTriggerError::InvalidLimit { limit: 0 };
        assert!(err.to_string().contains("invalid limit 0"));
    }

    #[test]
    fn retry_classification() {
        assert!(WikiTriggerError::SourceUnavailable("HTTP 503".into()).is_retryable());
        assert!(!WikiTriggerError::InvalidLimit { limit: -1 }.is_retryable());
        assert!(WikiTriggerError::InvalidLimit { limit: -1 }.is_caller_error());
        assert!(WikiTriggerError::validation("missing title").is_caller_error());
        assert!(!WikiTriggerError::invalid_cursor("corrupt").is_caller_error());
    }
}
