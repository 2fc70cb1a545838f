//! Cache store metrics.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "evpix_cluster_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "evpix_cluster_cache_misses_total";
    pub const CACHE_COALESCED_TOTAL: &str = "evpix_cluster_cache_coalesced_total";
    pub const FETCH_FAILURES_TOTAL: &str = "evpix_cluster_fetch_failures_total";
}

pub fn record_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

pub fn record_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

pub fn record_coalesced() {
    counter!(names::CACHE_COALESCED_TOTAL).increment(1);
}

pub fn record_fetch_failure(fallback: bool) {
    let labels = [("fallback", fallback.to_string())];
    counter!(names::FETCH_FAILURES_TOTAL, &labels).increment(1);
}
