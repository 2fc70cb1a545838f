//! Render-ready snapshot of a browser session.

use evpix_media::CropResult;
use evpix_models::{ClusterId, ClusterKind};
use serde::Serialize;

/// One cluster as displayed.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterCard {
    pub cluster_id: ClusterId,
    pub title: String,
    pub caption: String,
    pub face_count: u64,
    pub sample_count: usize,
    /// Index of the displayed sample, if the cluster has any
    pub current_sample: Option<usize>,
    pub selectable: bool,
    pub selected: bool,
    /// Crop of the displayed sample, or a placeholder
    pub thumbnail: CropResult,
}

/// Shown instead of the cluster list when nothing could be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyState {
    pub message: String,
    /// Whether retrying may help
    pub retryable: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BrowserView {
    /// Every cluster in load order, sentinels included
    pub cards: Vec<ClusterCard>,
    /// Thumbnails of all unassigned samples, shown as a strip
    pub unassigned_strip: Vec<CropResult>,
    pub processing_notice: Option<String>,
    pub empty: Option<EmptyState>,
    pub selected: Vec<ClusterId>,
}

impl BrowserView {
    /// Selectable person cards.
    pub fn people(&self) -> impl Iterator<Item = &ClusterCard> {
        self.cards
            .iter()
            .filter(|c| matches!(c.cluster_id.kind(), ClusterKind::Person(_)))
    }

    pub fn card(&self, cluster_id: ClusterId) -> Option<&ClusterCard> {
        self.cards.iter().find(|c| c.cluster_id == cluster_id)
    }
}

pub(crate) fn processing_notice(face_count: u64) -> String {
    format!("Still processing approximately {} new faces", face_count)
}
