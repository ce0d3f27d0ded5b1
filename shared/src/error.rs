//! Error types for the provisioning and agent bridge Lambda functions.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from an OpenSearch endpoint
    #[error("OpenSearch returned {status}: {body}")]
    OpenSearch { status: u16, body: String },

    /// Request signing error
    #[error("Signing error: {0}")]
    Signing(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// A wait on an external resource ran out of budget
    #[error("Timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    /// Agent completion stream error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
