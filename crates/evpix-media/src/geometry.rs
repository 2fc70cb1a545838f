//! Crop geometry.
//!
//! Every crop implementation goes through [`plan_crop`], so padding, clamping
//! and centering are computed in exactly one place.

use evpix_models::{BoundingBox, CropParams};

use crate::error::{MediaError, MediaResult};

/// Region of the source image, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where the padded face region ends up on the target canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropPlan {
    /// Padded and clamped region of the source image
    pub source: CropRect,
    /// Uniform scale applied to the region
    pub scale: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Top-left corner of the scaled region on the canvas
    pub offset_x: u32,
    pub offset_y: u32,
    pub target_width: u32,
    pub target_height: u32,
}

/// Padding in whole pixels; fractional pixels are dropped.
pub fn padding(extent: i64, ratio: f64) -> i64 {
    (extent as f64 * ratio).trunc() as i64
}

/// Compute the padded crop region and its placement on the target canvas.
///
/// The padded box is clamped to `[0, source_width] x [0, source_height]`.
/// A box without area, or one that has no area left after clamping, is an
/// `InvalidGeometry` error; no crop of non-positive extent is ever planned.
pub fn plan_crop(
    bbox: &BoundingBox,
    source_width: u32,
    source_height: u32,
    params: &CropParams,
) -> MediaResult<CropPlan> {
    params.validate()?;

    if bbox.is_degenerate() {
        return Err(MediaError::invalid_geometry(format!(
            "face box {}x{} has no area",
            bbox.width, bbox.height
        )));
    }
    if source_width == 0 || source_height == 0 {
        return Err(MediaError::invalid_geometry("source image is empty"));
    }

    let pad_x = padding(bbox.width, params.pad_x_ratio);
    let pad_y = padding(bbox.height, params.pad_y_ratio);
    let (max_x, max_y) = (i64::from(source_width), i64::from(source_height));

    let x1 = bbox.x.saturating_sub(pad_x).clamp(0, max_x);
    let y1 = bbox.y.saturating_sub(pad_y).clamp(0, max_y);
    let x2 = bbox.right().saturating_add(pad_x).clamp(0, max_x);
    let y2 = bbox.bottom().saturating_add(pad_y).clamp(0, max_y);

    let crop_width = x2 - x1;
    let crop_height = y2 - y1;
    if crop_width <= 0 || crop_height <= 0 {
        return Err(MediaError::invalid_geometry(format!(
            "face box at ({}, {}) lies outside the {}x{} image",
            bbox.x, bbox.y, source_width, source_height
        )));
    }

    let target_width = params.target_width;
    let target_height = params.target_height;
    let scale = (f64::from(target_width) / crop_width as f64)
        .min(f64::from(target_height) / crop_height as f64);

    let scaled_width = ((crop_width as f64 * scale).round() as u32).clamp(1, target_width);
    let scaled_height = ((crop_height as f64 * scale).round() as u32).clamp(1, target_height);

    Ok(CropPlan {
        source: CropRect {
            x: x1 as u32,
            y: y1 as u32,
            width: crop_width as u32,
            height: crop_height as u32,
        },
        scale,
        scaled_width,
        scaled_height,
        offset_x: (target_width - scaled_width) / 2,
        offset_y: (target_height - scaled_height) / 2,
        target_width,
        target_height,
    })
}
