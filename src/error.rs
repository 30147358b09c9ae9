//! Error types for the Ollama manifold pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Ollama manifold pipeline
///
/// None of these reach the host directly: model listing degrades to an
/// explanatory descriptor and completion turns them into
/// [`PipeOutput::Failed`](crate::pipeline::PipeOutput::Failed).
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Ollama server answered with a non-success status
    #[error("{status} error for url {url}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
        /// Response body text, if any
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller's request body cannot be forwarded
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A streamed body could not be split into text lines
    #[error("Stream error: {0}")]
    Stream(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Self::Stream(msg.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::config(err.to_string())
    }
}
