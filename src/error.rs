//! Error types for the VK API plugin.

use thiserror::Error;

/// Common error type for the VK API plugin.
#[derive(Error, Debug)]
pub enum VkApiError {
    /// A request was built with a missing or empty argument.
    ///
    /// This is a programming error on the caller's side and is never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error (connection failure or non-success status).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The dispatcher has been shut down and no longer accepts requests.
    #[error("dispatcher is closed")]
    Closed,
}

impl From<reqwest::Error> for VkApiError {
    fn from(e: reqwest::Error) -> Self {
        VkApiError::Http(e.to_string())
    }
}

/// Result type alias for VK API operations.
pub type Result<T> = std::result::Result<T, VkApiError>;
