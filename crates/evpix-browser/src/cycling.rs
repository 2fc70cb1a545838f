//! Rotation of the displayed sample per cluster.

use std::collections::BTreeMap;

use evpix_models::{Cluster, ClusterId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rotation {
    index: usize,
    len: usize,
}

/// Index of the currently displayed sample, per cluster.
///
/// Built from one cluster list and replaced wholesale when a new list
/// arrives, so an index always refers to the list it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CyclingState {
    rotations: BTreeMap<ClusterId, Rotation>,
}

impl CyclingState {
    /// Seed index 0 for every cluster that has at least one sample.
    pub fn from_clusters(clusters: &[Cluster]) -> Self {
        let rotations = clusters
            .iter()
            .filter(|c| !c.samples.is_empty())
            .map(|c| {
                (
                    c.cluster_id,
                    Rotation {
                        index: 0,
                        len: c.samples.len(),
                    },
                )
            })
            .collect();
        Self { rotations }
    }

    /// Advance every cluster with more than one sample. Returns how many moved.
    pub fn tick(&mut self) -> usize {
        let mut advanced = 0;
        for rotation in self.rotations.values_mut().filter(|r| r.len > 1) {
            rotation.index = (rotation.index + 1) % rotation.len;
            advanced += 1;
        }
        advanced
    }

    pub fn index(&self, cluster_id: ClusterId) -> Option<usize> {
        self.rotations.get(&cluster_id).map(|r| r.index)
    }

    /// `cluster_id -> index` for every tracked cluster.
    pub fn snapshot(&self) -> BTreeMap<ClusterId, usize> {
        self.rotations
            .iter()
            .map(|(id, r)| (*id, r.index))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }
}
