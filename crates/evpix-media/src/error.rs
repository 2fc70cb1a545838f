//! Error types for crop operations.

use std::time::Duration;

use evpix_models::ModelError;
use thiserror::Error;

/// Result type for crop operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while producing a face crop.
///
/// Every variant is terminal for the face that caused it: callers record the
/// failure and show a placeholder instead of retrying.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported image reference: {0}")]
    UnsupportedSource(String),

    #[error("Image fetch failed: {message}")]
    FetchFailed { message: String },

    #[error("Image fetch returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Image exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Image decode failed: {0}")]
    Decode(String),

    #[error("Invalid crop geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid crop parameters: {0}")]
    InvalidParams(#[from] ModelError),

    #[error("Image encode failed: {0}")]
    Encode(String),

    #[error("Crop service error: {0}")]
    Remote(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Map a reqwest error, keeping timeouts distinguishable.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::fetch_failed(err.to_string())
        }
    }

    /// Short, stable label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            MediaError::UnsupportedSource(_) => "unsupported_source",
            MediaError::FetchFailed { .. } | MediaError::HttpStatus(_) => "fetch",
            MediaError::TooLarge { .. } => "too_large",
            MediaError::Timeout(_) => "timeout",
            MediaError::Decode(_) => "decode",
            MediaError::InvalidGeometry(_) | MediaError::InvalidParams(_) => "geometry",
            MediaError::Encode(_) => "encode",
            MediaError::Remote(_) => "remote",
            MediaError::Cancelled => "cancelled",
            MediaError::Internal(_) => "internal",
        }
    }
}
