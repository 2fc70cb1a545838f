//! Selected person clusters.

use std::collections::BTreeSet;

use evpix_models::ClusterId;

/// Result of toggling a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// Sentinel ids cannot be selected
    Rejected,
}

impl ToggleOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, ToggleOutcome::Rejected)
    }
}

/// Set of selected cluster ids. Never contains a sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<ClusterId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary ids, dropping sentinels and duplicates.
    pub fn from_ids(ids: impl IntoIterator<Item = ClusterId>) -> Self {
        Self {
            ids: ids.into_iter().filter(|id| id.is_selectable()).collect(),
        }
    }

    pub fn toggle(&mut self, cluster_id: ClusterId) -> ToggleOutcome {
        if !cluster_id.is_selectable() {
            return ToggleOutcome::Rejected;
        }
        if self.ids.remove(&cluster_id) {
            ToggleOutcome::Deselected
        } else {
            self.ids.insert(cluster_id);
            ToggleOutcome::Selected
        }
    }

    pub fn contains(&self, cluster_id: ClusterId) -> bool {
        self.ids.contains(&cluster_id)
    }

    /// Selected ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.ids.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<ClusterId> {
        self.ids().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
