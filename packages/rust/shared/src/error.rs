//! Error types for the harvester.
//!
//! Library crates use [`AdoptedTextsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for setup, sink and upload operations.
///
/// Traversal failures of the link walk are not represented here; they end the
/// walk instead of propagating (see the crawler's `CrawlError`).
#[derive(Debug, thiserror::Error)]
pub enum AdoptedTextsError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside the link walk (client setup, hub requests).
    #[error("network error: {0}")]
    Network(String),

    /// HTML or response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad URL, empty repo id, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Remote dataset repository rejected a request.
    #[error("upload error: {0}")]
    Upload(String),

    /// Record serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AdoptedTextsError>;

impl AdoptedTextsError {
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

    /// Create an upload error from any displayable message.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
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
        let err = AdoptedTextsError::config("seed_url is not a valid URL");
        assert_eq!(err.to_string(), "config error: seed_url is not a valid URL");

        let err = AdoptedTextsError::upload("HTTP 403 Forbidden");
        assert!(err.to_string().starts_with("upload error:"));
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AdoptedTextsError::io("/tmp/out.jsonl", source);
        assert!(err.to_string().contains("/tmp/out.jsonl"));
    }
}
