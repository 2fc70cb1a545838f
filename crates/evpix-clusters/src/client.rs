//! Cluster query HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use evpix_models::Cluster;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{ClusterError, ClusterResult};

/// Largest sample size the cluster service accepts.
pub const MAX_SAMPLE_SIZE: u32 = 20;

/// Source of cluster summaries for an event.
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    async fn query_clusters(&self, event_code: &str, sample_size: u32)
        -> ClusterResult<Vec<Cluster>>;
}

/// Check a query before it reaches the network.
///
/// Event codes are restricted to `[a-zA-Z0-9_-]+`; sample sizes to
/// `1..=MAX_SAMPLE_SIZE`.
pub fn validate_query(event_code: &str, sample_size: u32) -> ClusterResult<()> {
    let valid_code = !event_code.is_empty()
        && event_code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_code {
        return Err(ClusterError::invalid_request(format!(
            "event code '{}' is not allowed",
            event_code
        )));
    }
    if !(1..=MAX_SAMPLE_SIZE).contains(&sample_size) {
        return Err(ClusterError::invalid_request(format!(
            "sample size {} outside 1..={}",
            sample_size, MAX_SAMPLE_SIZE
        )));
    }
    Ok(())
}

/// Configuration for the cluster client.
#[derive(Debug, Clone)]
pub struct ClusterClientConfig {
    /// Base URL of the backend API (e.g. `http://backend:8000/api/v1`)
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries
    pub max_retries: u32,
    /// First retry delay; doubles on each attempt
    pub retry_base_delay: Duration,
}

impl Default for ClusterClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://backend:8000/api/v1".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl ClusterClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("BACKEND_SERVER_URL")
                .unwrap_or_else(|_| "http://backend:8000/api/v1".to_string()),
            timeout: Duration::from_secs(
                std::env::var("CLUSTER_QUERY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: std::env::var("CLUSTER_QUERY_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Client for the backend's `/clusters` endpoint.
pub struct HttpClusterClient {
    http: Client,
    config: ClusterClientConfig,
}

impl HttpClusterClient {
    /// Create a new cluster client.
    pub fn new(config: ClusterClientConfig) -> ClusterResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ClusterError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ClusterResult<Self> {
        Self::new(ClusterClientConfig::from_env())
    }

    async fn fetch_once(&self, event_code: &str, sample_size: u32) -> ClusterResult<Vec<Cluster>> {
        let url = format!("{}/clusters", self.config.base_url.trim_end_matches('/'));

        let response = self
            .http
            .get(&url)
            .query(&[
                ("event_code", event_code.to_string()),
                ("sample_size", sample_size.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClusterError::Timeout(self.config.timeout)
                } else {
                    ClusterError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClusterError::from_http_status(status.as_u16(), &body));
        }

        let body = response.bytes().await.map_err(ClusterError::Network)?;
        serde_json::from_slice(&body).map_err(|e| ClusterError::InvalidResponse(e.to_string()))
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> ClusterResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = ClusterResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_base_delay * 2u32.pow(attempt);
                    warn!(
                        "Cluster query failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ClusterQuery for HttpClusterClient {
    async fn query_clusters(
        &self,
        event_code: &str,
        sample_size: u32,
    ) -> ClusterResult<Vec<Cluster>> {
        validate_query(event_code, sample_size)?;

        debug!(event_code, sample_size, "Querying clusters");

        let mut clusters = self
            .with_retry(|| self.fetch_once(event_code, sample_size))
            .await?;
        clusters.sort_by_key(|c| c.cluster_id);
        Ok(clusters)
    }
}
