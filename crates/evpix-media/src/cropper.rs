//! The face crop contract.

use async_trait::async_trait;
use evpix_models::{BoundingBox, CropParams};

use crate::error::MediaResult;
use crate::result::CropResult;

/// Produces a padded, centered thumbnail of one face.
///
/// Implementations must plan the crop with [`crate::geometry::plan_crop`] (or
/// delegate to a service that does), so every implementation pads, clamps and
/// centers identically. Errors are terminal for the face: callers record the
/// failure and fall back to [`crate::placeholder`].
#[async_trait]
pub trait FaceCropper: Send + Sync {
    async fn crop(
        &self,
        image_ref: &str,
        bbox: BoundingBox,
        params: CropParams,
    ) -> MediaResult<CropResult>;

    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;
}
