//! Unified error handling for the wdgraph crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while keeping the domain errors usable on
//! their own where a narrower type reads better.
//!
//! # Architecture
//!
//! - [`WdgraphErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use std::io;
use thiserror::Error;

pub use crate::utils::error::{ConfigError, QueryError, ResolutionError, ValidationError};

/// Common trait for wdgraph error types
pub trait WdgraphErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Configuration documents and settings
    Config,
    /// Country token resolution
    Resolution,
    /// Storage and I/O errors
    Storage,
    /// Parsing of responses, CSV, or serialized graphs
    Parsing,
    /// Malformed identifiers
    Validation,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Config => "config",
            Self::Resolution => "resolution",
            Self::Storage => "storage",
            Self::Parsing => "parsing",
            Self::Validation => "validation",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the wdgraph crate
#[derive(Error, Debug)]
pub enum Error {
    /// SPARQL query errors
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Country resolution errors
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Identifier validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML document errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// TOML document errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialized graph could not be parsed
    #[error("Turtle parse error at line {line}: {reason}")]
    Turtle { line: usize, reason: String },
}

impl WdgraphErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Query(e) => e.is_transient(),
            Self::Io(_) => true, // I/O errors are often transient
            Self::Config(_)
            | Self::Resolution(_)
            | Self::Validation(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::Toml(_)
            | Self::Csv(_)
            | Self::Turtle { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Query(QueryError::MalformedResponse(_)) => ErrorCategory::Parsing,
            Self::Query(_) => ErrorCategory::Network,
            Self::Config(_) | Self::Toml(_) | Self::Yaml(_) => ErrorCategory::Config,
            Self::Resolution(_) => ErrorCategory::Resolution,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) | Self::Csv(_) | Self::Turtle { .. } => ErrorCategory::Parsing,
        }
    }
}

impl Error {
    /// Create an invalid-configuration error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config(ConfigError::invalid(field, reason))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::Query(QueryError::Timeout);
        assert_eq!(err.category(), ErrorCategory::Network);

        let err = Error::Query(QueryError::MalformedResponse("eof".into()));
        assert_eq!(err.category(), ErrorCategory::Parsing);

        let err = Error::Resolution(ResolutionError::Empty);
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::Query(QueryError::Throttled { status: 429 }).is_recoverable());
        assert!(!Error::Query(QueryError::from_status(400, "")).is_recoverable());
        assert!(!Error::config("retry.max_attempts", "must be at least 1").is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let unified: Error = ResolutionError::Unknown {
            token: "Atlantis".into(),
        }
        .into();
        assert!(matches!(unified, Error::Resolution(_)));
        assert!(unified.to_string().contains("Atlantis"));
    }
}
