//! Resolving image references to raw bytes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::{MediaError, MediaResult};

/// Anything that can turn an image reference into encoded image bytes.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, image_ref: &str) -> MediaResult<Vec<u8>>;
}

/// Configuration for fetching remote images.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout, covering connect and body
    pub timeout: Duration,
    /// Largest accepted image body
    pub max_image_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_image_bytes: 20 * 1024 * 1024, // 20MB
        }
    }
}

impl FetchConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            timeout: Duration::from_secs(
                std::env::var("CROP_FETCH_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
            max_image_bytes: std::env::var("CROP_MAX_IMAGE_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20 * 1024 * 1024),
        }
    }
}

/// Fetches `http`/`https` image references.
pub struct HttpImageSource {
    http: Client,
    config: FetchConfig,
}

impl HttpImageSource {
    pub fn new(config: FetchConfig) -> MediaResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MediaError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> MediaResult<Self> {
        Self::new(FetchConfig::from_env())
    }

    fn parse_ref(image_ref: &str) -> MediaResult<Url> {
        let url = Url::parse(image_ref)
            .map_err(|e| MediaError::UnsupportedSource(format!("{}: {}", image_ref, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(MediaError::UnsupportedSource(format!(
                "scheme '{}' is not fetchable",
                other
            ))),
        }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, image_ref: &str) -> MediaResult<Vec<u8>> {
        let url = Self::parse_ref(image_ref)?;
        let limit = self.config.max_image_bytes;
        let timeout = self.config.timeout;

        debug!(url = %url, "Fetching source image");

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::HttpStatus(status.as_u16()));
        }

        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(MediaError::TooLarge { limit });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| MediaError::from_reqwest(e, timeout))?
        {
            if body.len() + chunk.len() > limit {
                return Err(MediaError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}
