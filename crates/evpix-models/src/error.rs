//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid cluster id: {0}")]
    InvalidClusterId(String),

    #[error("Invalid crop parameters: {0}")]
    InvalidCropParams(String),
}

impl ModelError {
    pub fn invalid_crop_params(msg: impl Into<String>) -> Self {
        Self::InvalidCropParams(msg.into())
    }
}
