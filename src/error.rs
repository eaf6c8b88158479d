//! Error types for taggr
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in taggr
#[derive(Debug, Error)]
pub enum TaggrError {
    /// Schedule group not found in the configuration state
    #[error("Schedule group not found: {0}")]
    GroupNotFound(String),

    /// Channel not found in the configuration state
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// Malformed request to the dispatch engine
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Configuration state error (unreadable or malformed data.json)
    #[error("State error: {0}")]
    State(String),

    /// Provider/model listing error
    #[error("Provider error: {0}")]
    Provider(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for taggr operations
pub type Result<T> = std::result::Result<T, TaggrError>;
