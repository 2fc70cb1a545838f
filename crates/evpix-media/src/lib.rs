//! Face crop service.
//!
//! This crate provides:
//! - Shared crop geometry (padding, clamping, fit and centering)
//! - The `FaceCropper` contract with in-process and remote implementations
//! - Image fetching with timeouts and size limits
//! - Placeholder rasters for faces that cannot be cropped

pub mod cropper;
pub mod error;
pub mod geometry;
pub mod local;
pub mod metrics;
pub mod placeholder;
pub mod remote;
pub mod result;
pub mod source;

pub use cropper::FaceCropper;
pub use error::{MediaError, MediaResult};
pub use geometry::{plan_crop, CropPlan, CropRect};
pub use local::{render_crop, LocalCropper};
pub use placeholder::{placeholder, PLACEHOLDER_LABEL};
pub use remote::{RemoteCropper, RemoteCropperConfig, PLACEHOLDER_HEADER};
pub use result::CropResult;
pub use source::{FetchConfig, HttpImageSource, ImageSource};
