//! Error types for the GitHub API layer.

use thiserror::Error;

/// Errors returned by [`GitHubClient`](crate::client::GitHubClient) calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure (connect, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success status that is not a rate-limit signal.
    #[error("request failed ({status}): {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        message: String,
    },

    /// Rate limit exceeded (403 or 429). Consumed by the client's
    /// cooldown loop and never returned to callers of the public API.
    #[error("rate limited ({status})")]
    RateLimited {
        /// HTTP status code that signalled the limit.
        status: u16,
    },

    /// Response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } | ApiError::RateLimited { status } => {
                Some(*status)
            }
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
