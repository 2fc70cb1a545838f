//! Generated stand-in for faces that cannot be cropped.

use evpix_models::crop::MAX_TARGET_DIMENSION;
use evpix_models::CropParams;
use image::{Rgb, RgbImage};
use tracing::error;

use crate::result::{encode_png, to_data_uri, CropResult};

/// Caption attached to every placeholder.
pub const PLACEHOLDER_LABEL: &str = "No Sample";

const BACKGROUND: Rgb<u8> = Rgb([0xF0, 0xF2, 0xF6]);
const SILHOUETTE: Rgb<u8> = Rgb([0x80, 0x80, 0x80]);

/// Build a placeholder of the requested size: a grey head-and-shoulders
/// silhouette on a light background.
///
/// Never fails; out-of-range sizes fall back to the default size.
pub fn placeholder(params: &CropParams) -> CropResult {
    let (width, height) = sanitize(params);
    let image = silhouette(width, height);

    let data_uri = match encode_png(&image) {
        Ok(png) => to_data_uri(&png),
        Err(e) => {
            error!("Failed to encode placeholder: {}", e);
            String::new()
        }
    };

    CropResult {
        data_uri,
        width,
        height,
        placeholder: true,
        label: Some(PLACEHOLDER_LABEL.to_string()),
    }
}

fn sanitize(params: &CropParams) -> (u32, u32) {
    let valid = |d: u32| d > 0 && d <= MAX_TARGET_DIMENSION;
    if valid(params.target_width) && valid(params.target_height) {
        (params.target_width, params.target_height)
    } else {
        let fallback = CropParams::default();
        (fallback.target_width, fallback.target_height)
    }
}

fn silhouette(width: u32, height: u32) -> RgbImage {
    let (w, h) = (f64::from(width), f64::from(height));
    let head = (w / 2.0, h * 0.38, w.min(h) * 0.18);
    let shoulders = (w / 2.0, h * 0.98, w * 0.32, h * 0.30);

    RgbImage::from_fn(width, height, |x, y| {
        let (px, py) = (f64::from(x) + 0.5, f64::from(y) + 0.5);

        let in_head = (px - head.0).powi(2) + (py - head.1).powi(2) <= head.2.powi(2);
        let in_shoulders = ((px - shoulders.0) / shoulders.2).powi(2)
            + ((py - shoulders.1) / shoulders.3).powi(2)
            <= 1.0;

        if in_head || in_shoulders {
            SILHOUETTE
        } else {
            BACKGROUND
        }
    })
}
