//! Cropping through the crop endpoint of a remote service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use evpix_models::{BoundingBox, CropParams};
use reqwest::Client;
use tracing::debug;

use crate::cropper::FaceCropper;
use crate::error::{MediaError, MediaResult};
use crate::metrics::{record_crop, record_crop_failure};
use crate::result::CropResult;

/// Response header set by the crop endpoint when it served a placeholder.
pub const PLACEHOLDER_HEADER: &str = "x-evpix-placeholder";

/// Configuration for the remote cropper.
#[derive(Debug, Clone)]
pub struct RemoteCropperConfig {
    /// Base URL of the crop service (without `/crop`)
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for RemoteCropperConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl RemoteCropperConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("CROP_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            timeout: Duration::from_secs(
                std::env::var("CROP_SERVICE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
        }
    }
}

/// Delegates cropping to the crop endpoint.
///
/// The endpoint answers failures with a placeholder instead of an error; this
/// client turns such answers back into an error so the caller treats the face
/// exactly as it would after a local failure.
pub struct RemoteCropper {
    http: Client,
    config: RemoteCropperConfig,
}

impl RemoteCropper {
    pub fn new(config: RemoteCropperConfig) -> MediaResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MediaError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> MediaResult<Self> {
        Self::new(RemoteCropperConfig::from_env())
    }

    async fn crop_inner(
        &self,
        image_ref: &str,
        bbox: BoundingBox,
        params: CropParams,
    ) -> MediaResult<CropResult> {
        params.validate()?;
        if !params.is_square() {
            return Err(MediaError::remote("crop endpoint only produces square targets"));
        }
        if bbox.is_degenerate() {
            return Err(MediaError::invalid_geometry(format!(
                "face box {}x{} has no area",
                bbox.width, bbox.height
            )));
        }

        let url = format!("{}/crop", self.config.base_url.trim_end_matches('/'));
        let query = [
            ("url", image_ref.to_string()),
            ("x", bbox.x.to_string()),
            ("y", bbox.y.to_string()),
            ("width", bbox.width.to_string()),
            ("height", bbox.height.to_string()),
            ("size", params.target_width.to_string()),
            ("padx", params.pad_x_ratio.to_string()),
            ("pady", params.pad_y_ratio.to_string()),
        ];

        debug!("Requesting crop from {}", url);

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| MediaError::from_reqwest(e, self.config.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::remote(format!("crop service returned {}", status)));
        }

        let is_placeholder = response
            .headers()
            .get(PLACEHOLDER_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if is_placeholder {
            return Err(MediaError::remote("crop service could not crop this face"));
        }

        let data_uri: String = response
            .json()
            .await
            .map_err(|e| MediaError::remote(format!("invalid crop response: {}", e)))?;
        if !data_uri.starts_with("data:image/") {
            return Err(MediaError::remote("crop response is not a data URI"));
        }

        Ok(CropResult {
            data_uri,
            width: params.target_width,
            height: params.target_height,
            placeholder: false,
            label: None,
        })
    }
}

#[async_trait]
impl FaceCropper for RemoteCropper {
    async fn crop(
        &self,
        image_ref: &str,
        bbox: BoundingBox,
        params: CropParams,
    ) -> MediaResult<CropResult> {
        let start = Instant::now();
        let result = self.crop_inner(image_ref, bbox, params).await;
        match &result {
            Ok(_) => record_crop(self.name(), start.elapsed().as_secs_f64()),
            Err(e) => record_crop_failure(self.name(), e),
        }
        result
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
