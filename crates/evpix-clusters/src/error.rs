//! Cluster query error types.

use std::time::Duration;

use thiserror::Error;

pub type ClusterResult<T> = Result<T, ClusterError>;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Invalid cluster query: {0}")]
    InvalidRequest(String),

    #[error("Cluster service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Rate limited by cluster service")]
    RateLimited,

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ClusterError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Map an HTTP error status to an error.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        match status {
            429 => Self::RateLimited,
            500..=599 => Self::ServiceUnavailable(format!("HTTP {}: {}", status, body)),
            _ => Self::RequestFailed(format!("HTTP {}: {}", status, body)),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClusterError::ServiceUnavailable(_)
                | ClusterError::RateLimited
                | ClusterError::Timeout(_)
                | ClusterError::Network(_)
        )
    }
}
