//! Browser configuration.

use std::time::Duration;

use evpix_models::{CropParams, CropPreset};

/// Default delay between sample rotations.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(2);

/// Default upper bound on a single thumbnail crop.
pub const DEFAULT_CROP_TIMEOUT: Duration = Duration::from_secs(15);

/// Query parameter holding the selected cluster ids.
pub const DEFAULT_FILTER_PARAM: &str = "faceFilter";

/// Largest sample size offered by the browser.
pub const MAX_BROWSER_SAMPLE_SIZE: u32 = 5;

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub cycle_interval: Duration,
    pub crop_timeout: Duration,
    /// Samples requested per cluster
    pub sample_size: u32,
    /// Crop for person cards
    pub person_crop: CropParams,
    /// Crop for the unassigned strip
    pub unassigned_crop: CropParams,
    pub filter_param: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            cycle_interval: DEFAULT_CYCLE_INTERVAL,
            crop_timeout: DEFAULT_CROP_TIMEOUT,
            sample_size: MAX_BROWSER_SAMPLE_SIZE,
            person_crop: CropPreset::PersonCard.params(),
            unassigned_crop: CropPreset::UnassignedStrip.params(),
            filter_param: DEFAULT_FILTER_PARAM.to_string(),
        }
    }
}

impl BrowserConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cycle_interval: std::env::var("FACE_CYCLE_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|ms: &u64| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.cycle_interval),
            crop_timeout: std::env::var("FACE_CROP_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.crop_timeout),
            sample_size: std::env::var("FACE_SAMPLE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(clamp_sample_size)
                .unwrap_or(defaults.sample_size),
            ..defaults
        }
    }
}

/// Clamp a requested sample size into the range the browser offers.
pub fn clamp_sample_size(sample_size: u32) -> u32 {
    sample_size.clamp(1, MAX_BROWSER_SAMPLE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults() {
        let config = BrowserConfig::default();
        assert_eq!(config.cycle_interval, Duration::from_secs(2));
        assert_eq!(config.person_crop.target_width, 100);
        assert_eq!(config.unassigned_crop.target_width, 80);
        assert_eq!(config.filter_param, "faceFilter");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("FACE_CYCLE_INTERVAL_MS", "500");
        std::env::set_var("FACE_SAMPLE_SIZE", "12");
        let config = BrowserConfig::from_env();
        std::env::remove_var("FACE_CYCLE_INTERVAL_MS");
        std::env::remove_var("FACE_SAMPLE_SIZE");

        assert_eq!(config.cycle_interval, Duration::from_millis(500));
        assert_eq!(config.sample_size, MAX_BROWSER_SAMPLE_SIZE);
    }

    #[test]
    fn test_clamp_sample_size() {
        assert_eq!(clamp_sample_size(0), 1);
        assert_eq!(clamp_sample_size(3), 3);
        assert_eq!(clamp_sample_size(9), 5);
    }
}
