//! Axum HTTP server for face crops.
//!
//! This crate provides:
//! - The crop endpoint (`/crop`, `/api/crop`), which always answers with an image
//! - Health and readiness probes
//! - Rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, CropperBackend};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
