//! Crop parameters shared by every crop implementation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Padding added around the face box, as a fraction of the box extent.
pub const DEFAULT_PAD_RATIO: f64 = 0.3;

/// Square size used by the crop endpoint when the caller gives none.
pub const ENDPOINT_DEFAULT_SIZE: u32 = 150;

/// Largest accepted target dimension.
pub const MAX_TARGET_DIMENSION: u32 = 1024;

/// Largest accepted padding ratio.
pub const MAX_PAD_RATIO: f64 = 2.0;

/// Target raster size and padding for one crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CropParams {
    pub target_width: u32,
    pub target_height: u32,
    pub pad_x_ratio: f64,
    pub pad_y_ratio: f64,
}

impl Default for CropParams {
    fn default() -> Self {
        Self::square(ENDPOINT_DEFAULT_SIZE)
    }
}

impl CropParams {
    /// Square target with the default padding.
    pub fn square(size: u32) -> Self {
        Self {
            target_width: size,
            target_height: size,
            pad_x_ratio: DEFAULT_PAD_RATIO,
            pad_y_ratio: DEFAULT_PAD_RATIO,
        }
    }

    pub fn with_padding(mut self, pad_x_ratio: f64, pad_y_ratio: f64) -> Self {
        self.pad_x_ratio = pad_x_ratio;
        self.pad_y_ratio = pad_y_ratio;
        self
    }

    pub fn is_square(&self) -> bool {
        self.target_width == self.target_height
    }

    /// Reject sizes and ratios no implementation should attempt.
    pub fn validate(&self) -> ModelResult<()> {
        for (name, dim) in [("width", self.target_width), ("height", self.target_height)] {
            if dim == 0 || dim > MAX_TARGET_DIMENSION {
                return Err(ModelError::invalid_crop_params(format!(
                    "target {} {} outside 1..={}",
                    name, dim, MAX_TARGET_DIMENSION
                )));
            }
        }
        for (name, ratio) in [("padx", self.pad_x_ratio), ("pady", self.pad_y_ratio)] {
            if !ratio.is_finite() || !(0.0..=MAX_PAD_RATIO).contains(&ratio) {
                return Err(ModelError::invalid_crop_params(format!(
                    "{} {} outside 0..={}",
                    name, ratio, MAX_PAD_RATIO
                )));
            }
        }
        Ok(())
    }
}

/// Crop sizes used by the different browsing surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CropPreset {
    /// Rotating thumbnail on a person card
    PersonCard,
    /// Small samples of the unassigned bucket
    UnassignedStrip,
    /// Similarity search results
    SimilarFace,
    /// Crop endpoint default
    Endpoint,
}

impl CropPreset {
    pub fn params(self) -> CropParams {
        match self {
            CropPreset::PersonCard => CropParams::square(100),
            CropPreset::UnassignedStrip => CropParams::square(80),
            CropPreset::SimilarFace => CropParams::square(120),
            CropPreset::Endpoint => CropParams::square(ENDPOINT_DEFAULT_SIZE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for preset in [
            CropPreset::PersonCard,
            CropPreset::UnassignedStrip,
            CropPreset::SimilarFace,
            CropPreset::Endpoint,
        ] {
            assert!(preset.params().validate().is_ok(), "{:?}", preset);
        }
        assert_eq!(CropPreset::PersonCard.params().target_width, 100);
        assert_eq!(CropParams::default().target_width, ENDPOINT_DEFAULT_SIZE);
    }

    #[test]
    fn test_rejects_zero_target() {
        let params = CropParams {
            target_width: 0,
            ..CropParams::square(100)
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_padding() {
        assert!(CropParams::square(100).with_padding(-0.1, 0.3).validate().is_err());
        assert!(CropParams::square(100).with_padding(0.3, f64::NAN).validate().is_err());
        assert!(CropParams::square(100).with_padding(0.0, 2.0).validate().is_ok());
    }
}
