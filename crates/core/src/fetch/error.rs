//! Error types for the fetch module.

use thiserror::Error;

/// Errors that can occur while fetching a PDF.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {reason}")]
    Client { reason: String },

    /// The request could not be sent or the body could not be read.
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("Fetching {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The server answered with an empty body.
    #[error("Fetching {url} returned an empty body")]
    EmptyBody { url: String },

    /// Writing the downloaded file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn request(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Request {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
