//! Error types for the wdgraph pipeline
//!
//! This module defines the domain-specific error types used throughout the application.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while executing a SPARQL query
#[derive(Error, Debug)]
pub enum QueryError {
    /// Request timed out before the endpoint answered
    #[error("Request timeout")]
    Timeout,

    /// Connection to the endpoint could not be established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Endpoint signalled throttling (HTTP 429)
    #[error("Rate limit exceeded (HTTP {status})")]
    Throttled { status: u16 },

    /// Endpoint temporarily unavailable (HTTP 5xx gateway/service errors)
    #[error("Endpoint unavailable (HTTP {status})")]
    Unavailable { status: u16 },

    /// Endpoint rejected the query
    #[error("Query rejected (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Response body was not valid SPARQL JSON results
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Any other HTTP client failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl QueryError {
    /// Whether this failure is worth another attempt
    ///
    /// Retry on:
    /// - timeouts and connection failures
    /// - 429 (Too Many Requests)
    /// - 500, 502, 503, 504
    ///
    /// Everything else is fatal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Connect(_) | Self::Throttled { .. } | Self::Unavailable { .. }
        )
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            429 => Self::Throttled { status },
            500 | 502 | 503 | 504 => Self::Unavailable { status },
            _ => Self::Rejected {
                status,
                body: body.into(),
            },
        }
    }

    /// Classify a transport-level reqwest failure
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_request() || err.is_body() {
            // dropped or reset connection, before or while reading the body
            Self::Connect(err.to_string())
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

/// Errors raised while loading or validating configuration documents
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required document does not exist
    #[error("Configuration file not found: {}", path.display())]
    Missing { path: PathBuf },

    /// Document exists but lacks a required section
    #[error("Configuration file {} is missing section '{section}'", path.display())]
    MissingSection { path: PathBuf, section: String },

    /// Document could not be parsed
    #[error("Failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A value failed validation
    #[error("Invalid configuration for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while resolving a country token
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolutionError {
    /// Token was empty after trimming
    #[error("Empty country token")]
    Empty,

    /// Token matched no identifier, name, or alias
    #[error("Could not resolve country '{token}'; add it to the 'countries' or 'aliases' section")]
    Unknown { token: String },
}

/// Identifier failed the strict pattern check
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} identifier: '{value}'")]
pub struct ValidationError {
    pub kind: &'static str,
    pub value: String,
}
