//! Error types for LinkScout.
//!
//! Library crates use [`LinkScoutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-page failures ([`FetchError`], [`ClassificationError`]) are kept as
//! separate enums so the orchestrator can turn them into degraded results
//! instead of propagating them.

use std::path::PathBuf;

/// Top-level error type for all LinkScout operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Missing or malformed caller input, rejected before any external call.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A page (or search results page) could not be rendered.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The classification service failed or answered with garbage.
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    /// A stage's required collaborator failed entirely.
    #[error("upstream error: {message}")]
    Upstream { message: String },

    /// HTML or response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LinkScoutError>;

impl LinkScoutError {
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

    /// Create an upstream error from any displayable message.
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

    /// Short machine-friendly label used in failure responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Validation { .. } => "validation",
            Self::Fetch(_) => "fetch",
            Self::Classification(_) => "classification",
            Self::Upstream { .. } => "upstream",
            Self::Parse { .. } => "parse",
            Self::Io { .. } => "io",
        }
    }
}

/// Failure to render a single page.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The wall-clock budget for the fetch expired.
    #[error("fetch of {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The page could be requested but navigation or reading failed.
    #[error("navigation to {url} failed: {message}")]
    NavigationFailed { url: String, message: String },

    /// The rendering engine (browser session, HTTP client) could not be acquired.
    #[error("rendering resource unavailable: {0}")]
    ResourceUnavailable(String),
}

impl FetchError {
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NavigationFailed {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Failure of the external classification service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassificationError {
    /// No answer within the classifier budget.
    #[error("classifier timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The service answered, but not with the expected envelope.
    #[error("malformed classifier response: {0}")]
    MalformedResponse(String),

    /// The service could not be reached or returned a failure status.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LinkScoutError::validation("keywords are required");
        assert_eq!(err.to_string(), "validation error: keywords are required");

        let err = LinkScoutError::from(FetchError::Timeout {
            url: "https://forum.example.de/".into(),
            secs: 30,
        });
        assert_eq!(
            err.to_string(),
            "fetch of https://forum.example.de/ timed out after 30s"
        );
        assert_eq!(err.kind(), "fetch");
    }

    #[test]
    fn classification_error_is_transparent() {
        let err = LinkScoutError::from(ClassificationError::Timeout { secs: 120 });
        assert_eq!(err.to_string(), "classifier timed out after 120s");
        assert_eq!(err.kind(), "classification");
    }
}
