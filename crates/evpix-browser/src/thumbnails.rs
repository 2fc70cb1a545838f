//! Per-face thumbnail status.

use std::collections::HashMap;

use evpix_media::CropResult;
use evpix_models::FaceId;

#[derive(Debug, Clone, PartialEq)]
pub enum ThumbnailState {
    /// Crop submitted, no result yet
    Pending,
    Ready(CropResult),
    /// Crop failed; a placeholder is shown from now on
    Failed,
}

/// Crop status keyed by face id.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailTable {
    entries: HashMap<FaceId, ThumbnailState>,
}

impl ThumbnailTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, face_id: FaceId) -> Option<&ThumbnailState> {
        self.entries.get(&face_id)
    }

    /// The crop to display, if one is ready.
    pub fn ready(&self, face_id: FaceId) -> Option<&CropResult> {
        match self.entries.get(&face_id) {
            Some(ThumbnailState::Ready(crop)) => Some(crop),
            _ => None,
        }
    }

    /// Whether a crop for this face is ready or already submitted.
    pub fn is_ready_or_pending(&self, face_id: FaceId) -> bool {
        matches!(
            self.entries.get(&face_id),
            Some(ThumbnailState::Ready(_)) | Some(ThumbnailState::Pending)
        )
    }

    pub fn mark_pending(&mut self, face_id: FaceId) {
        self.entries.insert(face_id, ThumbnailState::Pending);
    }

    pub fn mark_ready(&mut self, face_id: FaceId, crop: CropResult) {
        self.entries.insert(face_id, ThumbnailState::Ready(crop));
    }

    pub fn mark_failed(&mut self, face_id: FaceId) {
        self.entries.insert(face_id, ThumbnailState::Failed);
    }

    /// Drop entries for faces not in `keep`.
    pub fn retain(&mut self, keep: impl Fn(FaceId) -> bool) {
        self.entries.retain(|face_id, _| keep(*face_id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
