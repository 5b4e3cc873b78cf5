//! Error types for the posts API client.
//!
//! # Design
//! Every failure an action can hit maps to one variant. The dispatcher turns
//! them into a single user-visible line; `Display` is that line's tail, so
//! messages stay short and free of debug formatting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable base URL was configured.
    #[error("{0}")]
    Config(String),

    /// User input was rejected before any request was built.
    #[error("{0}")]
    Validation(String),

    /// The server answered with a non-2xx status. `message` is either the
    /// status text or the `error` field of the server's JSON body.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response (refused, DNS, reset).
    #[error("network error: {0}")]
    Network(String),

    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("render failed: {0}")]
    Render(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<askama::Error> for ApiError {
    fn from(e: askama::Error) -> Self {
        ApiError::Render(e.to_string())
    }
}
