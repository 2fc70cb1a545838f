//! Crop metrics.

use metrics::{counter, histogram};

use crate::error::MediaError;

/// Metric names as constants for consistency.
pub mod names {
    pub const CROPS_TOTAL: &str = "evpix_crops_total";
    pub const CROP_FAILURES_TOTAL: &str = "evpix_crop_failures_total";
    pub const CROP_DURATION_SECONDS: &str = "evpix_crop_duration_seconds";
}

/// Record a successful crop.
pub fn record_crop(cropper: &'static str, duration_secs: f64) {
    let labels = [("cropper", cropper.to_string())];
    counter!(names::CROPS_TOTAL, &labels).increment(1);
    histogram!(names::CROP_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a failed crop.
pub fn record_crop_failure(cropper: &'static str, error: &MediaError) {
    let labels = [
        ("cropper", cropper.to_string()),
        ("reason", error.reason().to_string()),
    ];
    counter!(names::CROP_FAILURES_TOTAL, &labels).increment(1);
}
