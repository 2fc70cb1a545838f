//! Cluster query client and cache store.
//!
//! The clustering itself happens in an external service. This crate fetches
//! its results and memoizes them per `(event_code, sample_size)` with a TTL,
//! allowing at most one in-flight fetch per key.

pub mod cache;
pub mod client;
pub mod error;
pub mod metrics;

pub use cache::{CacheConfig, CacheKey, ClusterCache, ClusterLoad, LoadOrigin};
pub use client::{
    validate_query, ClusterClientConfig, ClusterQuery, HttpClusterClient, MAX_SAMPLE_SIZE,
};
pub use error::{ClusterError, ClusterResult};
