//! In-process cropping with the `image` crate.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use evpix_models::{BoundingBox, CropParams};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use tracing::debug;

use crate::cropper::FaceCropper;
use crate::error::{MediaError, MediaResult};
use crate::geometry::{plan_crop, CropPlan};
use crate::metrics::{record_crop, record_crop_failure};
use crate::result::CropResult;
use crate::source::ImageSource;

/// Canvas fill around the scaled face region.
pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);

/// Decode `bytes`, crop the padded face box and fit it onto the target canvas.
///
/// Pure and deterministic: identical inputs give identical pixels.
pub fn render_crop(bytes: &[u8], bbox: BoundingBox, params: CropParams) -> MediaResult<RgbImage> {
    params.validate()?;
    if bbox.is_degenerate() {
        return Err(MediaError::invalid_geometry(format!(
            "face box {}x{} has no area",
            bbox.width, bbox.height
        )));
    }

    let source = image::load_from_memory(bytes)
        .map_err(|e| MediaError::decode(e.to_string()))?
        .to_rgb8();

    let plan = plan_crop(&bbox, source.width(), source.height(), &params)?;
    Ok(compose(&source, &plan))
}

fn compose(source: &RgbImage, plan: &CropPlan) -> RgbImage {
    let region = imageops::crop_imm(
        source,
        plan.source.x,
        plan.source.y,
        plan.source.width,
        plan.source.height,
    )
    .to_image();

    let scaled = imageops::resize(
        &region,
        plan.scaled_width,
        plan.scaled_height,
        FilterType::Lanczos3,
    );

    let mut canvas = RgbImage::from_pixel(plan.target_width, plan.target_height, BACKGROUND);
    imageops::overlay(
        &mut canvas,
        &scaled,
        i64::from(plan.offset_x),
        i64::from(plan.offset_y),
    );
    canvas
}

/// Fetches the source image and crops it on the blocking pool.
#[derive(Clone)]
pub struct LocalCropper {
    source: Arc<dyn ImageSource>,
}

impl LocalCropper {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self { source }
    }

    async fn crop_inner(
        &self,
        image_ref: &str,
        bbox: BoundingBox,
        params: CropParams,
    ) -> MediaResult<CropResult> {
        // Reject before paying for the fetch.
        params.validate()?;
        if bbox.is_degenerate() {
            return Err(MediaError::invalid_geometry(format!(
                "face box {}x{} has no area",
                bbox.width, bbox.height
            )));
        }

        let bytes = self.source.fetch(image_ref).await?;
        debug!(bytes = bytes.len(), "Source image fetched, cropping");

        tokio::task::spawn_blocking(move || {
            render_crop(&bytes, bbox, params).and_then(|canvas| CropResult::from_image(&canvas))
        })
        .await
        .map_err(|e| MediaError::internal(format!("crop task failed: {}", e)))?
    }
}

#[async_trait]
impl FaceCropper for LocalCropper {
    async fn crop(
        &self,
        image_ref: &str,
        bbox: BoundingBox,
        params: CropParams,
    ) -> MediaResult<CropResult> {
        let start = Instant::now();
        let result = self.crop_inner(image_ref, bbox, params).await;
        match &result {
            Ok(_) => record_crop(self.name(), start.elapsed().as_secs_f64()),
            Err(e) => record_crop_failure(self.name(), e),
        }
        result
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
