//! Application state.

use std::sync::Arc;

use evpix_media::{FaceCropper, HttpImageSource, LocalCropper, RemoteCropper};
use tracing::info;

use crate::config::{ApiConfig, CropperBackend};
use crate::error::ApiResult;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub cropper: Arc<dyn FaceCropper>,
}

impl AppState {
    pub fn new(config: ApiConfig, cropper: Arc<dyn FaceCropper>) -> Self {
        Self { config, cropper }
    }

    /// Build the configured cropper from environment variables.
    pub fn from_env(config: ApiConfig) -> ApiResult<Self> {
        let cropper: Arc<dyn FaceCropper> = match config.cropper {
            CropperBackend::Local => {
                let source = HttpImageSource::from_env()?;
                Arc::new(LocalCropper::new(Arc::new(source)))
            }
            CropperBackend::Remote => Arc::new(RemoteCropper::from_env()?),
        };
        info!(cropper = cropper.name(), "Face cropper configured");

        Ok(Self::new(config, cropper))
    }
}
