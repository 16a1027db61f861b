//! Error types for the chat client

use thiserror::Error;

/// Result alias for chat client operations
pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Errors returned by the chat client
#[derive(Error, Debug)]
pub enum LlmError {
    /// The request never produced an HTTP response, or its body was unreadable
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("API request failed with status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body as returned
        body: String,
    },

    /// The completion had no choices to read a reply from
    #[error("completion response contained no choices")]
    EmptyResponse,

    /// Client misconfiguration
    #[error("configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
