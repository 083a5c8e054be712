//! Error types for Mira
//!
//! This module defines the error types used throughout the client,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Mira operations
///
/// Covers configuration loading, calls to the assistant backend,
/// snapshot persistence, and session lookups.
#[derive(Error, Debug)]
pub enum MiraError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Assistant backend errors (non-2xx status, unexpected response shape)
    #[error("Assistant API error: {0}")]
    Api(String),

    /// Snapshot storage errors (database or file operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A session id that is not present in the session list
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Mira operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
