//! Error types for Tabletalk
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Tabletalk operations
///
/// This enum covers ingestion of uploaded files, connections to external
/// stores, provider interactions, SQL tool execution and configuration.
#[derive(Error, Debug)]
pub enum TabletalkError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Uploaded file could not be read or parsed into a table
    #[error("Ingest error: {0}")]
    Ingest(String),

    /// Connection descriptor is invalid or the store cannot be opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// A question was submitted before any data source was configured
    #[error("No active data source: {0}")]
    NoActiveStore(String),

    /// Provider-related errors (API calls, malformed responses, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Missing credentials for provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Authentication errors (e.g., 401 Unauthorized)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Provider rejected the request because of rate limiting or quota
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// SQL execution against the active store failed
    #[error("Query error: {0}")]
    Query(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// Agent exceeded maximum iteration limit
    #[error("Agent exceeded maximum iterations: limit={limit}, {message}")]
    MaxIterationsExceeded {
        /// The configured iteration limit
        limit: usize,
        /// Additional context about the failure
        message: String,
    },

    /// Agent did not finish within the configured time budget
    #[error("Agent timed out after {0} seconds")]
    Timeout(u64),

    /// SQLite errors
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for Tabletalk operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
