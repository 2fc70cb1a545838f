//! Face crop endpoint.
//!
//! `GET /crop?url=..&x=..&y=..&width=..&height=..&size=..&padx=..&pady=..`
//! answers with a JSON string holding a `data:image/png;base64,..` URI. Any
//! failure, including a malformed request, is answered with a placeholder
//! image flagged by the `x-evpix-placeholder` header, never an HTTP error.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use evpix_media::{placeholder, CropResult, PLACEHOLDER_HEADER};
use evpix_models::{BoundingBox, CropParams, DEFAULT_PAD_RATIO, ENDPOINT_DEFAULT_SIZE};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::metrics;
use crate::state::AppState;

const CACHEABLE: &str = "public, max-age=3600";

/// Raw query. Everything is optional text so that a bad value becomes a
/// placeholder rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CropQuery {
    pub url: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub size: Option<String>,
    pub padx: Option<String>,
    pub pady: Option<String>,
}

/// Validated crop request.
#[derive(Debug, Clone, PartialEq)]
pub struct CropRequest {
    pub url: String,
    pub bbox: BoundingBox,
    pub params: CropParams,
}

impl CropQuery {
    pub fn parse(&self) -> Result<CropRequest, String> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "missing url".to_string())?;

        let bbox = BoundingBox::new(
            coordinate("x", &self.x)?,
            coordinate("y", &self.y)?,
            coordinate("width", &self.width)?,
            coordinate("height", &self.height)?,
        );

        let size = match &self.size {
            Some(raw) => {
                let size = number("size", raw)?;
                if size < 1.0 {
                    return Err(format!("invalid size: {}", raw));
                }
                size.round() as u32
            }
            None => ENDPOINT_DEFAULT_SIZE,
        };
        let padx = optional_number("padx", &self.padx)?.unwrap_or(DEFAULT_PAD_RATIO);
        let pady = optional_number("pady", &self.pady)?.unwrap_or(DEFAULT_PAD_RATIO);

        Ok(CropRequest {
            url: url.to_string(),
            bbox,
            params: CropParams::square(size).with_padding(padx, pady),
        })
    }

    /// Best-effort target size for a placeholder when the request is invalid.
    pub fn placeholder_params(&self) -> CropParams {
        self.size
            .as_deref()
            .and_then(|raw| number("size", raw).ok())
            .filter(|size| *size >= 1.0)
            .map(|size| CropParams::square(size.round() as u32))
            .unwrap_or_default()
    }
}

fn number(name: &str, raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("invalid {}: {:?}", name, raw))
}

fn optional_number(name: &str, raw: &Option<String>) -> Result<Option<f64>, String> {
    raw.as_deref().map(|raw| number(name, raw)).transpose()
}

/// Bounding box values are truncated toward zero.
fn coordinate(name: &str, raw: &Option<String>) -> Result<i64, String> {
    let raw = raw.as_deref().ok_or_else(|| format!("missing {}", name))?;
    Ok(number(name, raw)?.trunc() as i64)
}

/// Crop a face from a remote image.
pub async fn crop_face(
    State(state): State<AppState>,
    query: Result<Query<CropQuery>, QueryRejection>,
) -> Response {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed crop query, serving placeholder");
            return placeholder_response(&CropParams::default(), "invalid_request");
        }
    };

    let request = match query.parse() {
        Ok(request) => request,
        Err(message) => {
            warn!(error = %message, "Invalid crop request, serving placeholder");
            return placeholder_response(&query.placeholder_params(), "invalid_request");
        }
    };

    match state
        .cropper
        .crop(&request.url, request.bbox, request.params)
        .await
    {
        Ok(crop) if !crop.placeholder => {
            debug!(url = %request.url, size = crop.width, "Crop served");
            image_response(crop)
        }
        Ok(_) => placeholder_response(&request.params, "remote_placeholder"),
        Err(e) => {
            warn!(
                url = %request.url,
                reason = e.reason(),
                "Crop failed, serving placeholder: {}",
                e
            );
            placeholder_response(&request.params, e.reason())
        }
    }
}

fn image_response(crop: CropResult) -> Response {
    (
        [(header::CACHE_CONTROL, HeaderValue::from_static(CACHEABLE))],
        Json(crop.data_uri),
    )
        .into_response()
}

fn placeholder_response(params: &CropParams, reason: &str) -> Response {
    metrics::record_placeholder_served(reason);
    let crop = placeholder(params);
    (
        [
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
            (HeaderName::from_static(PLACEHOLDER_HEADER), HeaderValue::from_static("true")),
        ],
        Json(crop.data_uri),
    )
        .into_response()
}
