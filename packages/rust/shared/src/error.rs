//! Error types for coalwire.
//!
//! Library crates use [`CoalwireError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all coalwire operations.
#[derive(Debug, thiserror::Error)]
pub enum CoalwireError {
    /// Configuration loading or validation error. Fatal for a cycle:
    /// surfaced to the operator before any platform is attempted.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during discovery, validation, or delivery.
    #[error("network error: {0}")]
    Network(String),

    /// Response parsing error (search envelope, docstore payload, legacy state).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Platform delivery error after retries were exhausted.
    #[error("publish error: {0}")]
    Publish(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (terminal candidate rejection, bad input).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CoalwireError>;

impl CoalwireError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CoalwireError::config("missing bot token");
        assert_eq!(err.to_string(), "config error: missing bot token");

        let err = CoalwireError::validation("summary below 100 characters");
        assert!(err.to_string().contains("100 characters"));
    }
}
