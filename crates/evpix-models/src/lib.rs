//! Shared data models for face-cluster browsing.
//!
//! This crate provides Serde-serializable types for:
//! - Face clusters and their sentinel buckets
//! - Sample faces and their bounding boxes
//! - Crop parameters and call-site presets

pub mod cluster;
pub mod crop;
pub mod error;
pub mod rect;

// Re-export common types
pub use cluster::{Cluster, ClusterId, ClusterKind, FaceId, Sample};
pub use crop::{CropParams, CropPreset, DEFAULT_PAD_RATIO, ENDPOINT_DEFAULT_SIZE};
pub use error::{ModelError, ModelResult};
pub use rect::BoundingBox;
