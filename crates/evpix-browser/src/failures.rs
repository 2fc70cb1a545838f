//! Faces whose crop has failed.

use std::collections::HashSet;

use evpix_models::FaceId;
use tokio::sync::RwLock;

/// Faces that must not be submitted for cropping again.
///
/// Shared by every session in the process; entries are never removed.
#[derive(Debug, Default)]
pub struct CropFailureSet {
    faces: RwLock<HashSet<FaceId>>,
}

impl CropFailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. Returns `false` if the face was already recorded.
    pub async fn insert(&self, face_id: FaceId) -> bool {
        self.faces.write().await.insert(face_id)
    }

    pub async fn contains(&self, face_id: FaceId) -> bool {
        self.faces.read().await.contains(&face_id)
    }

    pub async fn len(&self) -> usize {
        self.faces.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.faces.read().await.is_empty()
    }
}
