//! Encoded crop output.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{MediaError, MediaResult};

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// A finished thumbnail, ready to hand to a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropResult {
    /// `data:image/png;base64,...`
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
    /// True when this is a generated stand-in rather than a face crop
    #[serde(default)]
    pub placeholder: bool,
    /// Caption shown with a placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CropResult {
    /// Encode a rendered canvas as a PNG data URI.
    pub fn from_image(image: &RgbImage) -> MediaResult<Self> {
        let png = encode_png(image)?;
        Ok(Self {
            data_uri: to_data_uri(&png),
            width: image.width(),
            height: image.height(),
            placeholder: false,
            label: None,
        })
    }

    /// Decode the PNG bytes back out of the data URI.
    pub fn png_bytes(&self) -> MediaResult<Vec<u8>> {
        let payload = self
            .data_uri
            .strip_prefix(PNG_DATA_URI_PREFIX)
            .ok_or_else(|| MediaError::decode("not a PNG data URI"))?;
        STANDARD
            .decode(payload)
            .map_err(|e| MediaError::decode(e.to_string()))
    }
}

/// PNG-encode an RGB canvas. Output is deterministic for identical pixels.
pub fn encode_png(image: &RgbImage) -> MediaResult<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| MediaError::Encode(e.to_string()))?;
    Ok(buf)
}

pub fn to_data_uri(png: &[u8]) -> String {
    format!("{}{}", PNG_DATA_URI_PREFIX, STANDARD.encode(png))
}
