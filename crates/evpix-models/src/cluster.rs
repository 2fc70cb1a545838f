//! Face clusters as reported by the clustering service.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::rect::BoundingBox;

/// Primary key of a detected face.
pub type FaceId = i64;

/// Cluster label.
///
/// Non-negative values identify a person. `-1` marks faces that have not been
/// grouped yet and `-2` marks faces still waiting on the pipeline. Any other
/// negative value is displayed like the unassigned bucket. Negative ids are
/// never selectable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct ClusterId(pub i64);

/// What a cluster id stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterKind {
    Person(u64),
    Unassigned,
    Processing,
}

impl ClusterId {
    /// Faces not yet grouped into a person.
    pub const UNASSIGNED: ClusterId = ClusterId(-1);
    /// Faces awaiting pipeline completion.
    pub const PROCESSING: ClusterId = ClusterId(-2);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }

    pub fn kind(self) -> ClusterKind {
        match self.0 {
            id if id >= 0 => ClusterKind::Person(id as u64),
            -2 => ClusterKind::Processing,
            _ => ClusterKind::Unassigned,
        }
    }

    /// True for reserved, non-person ids.
    pub fn is_sentinel(self) -> bool {
        self.0 < 0
    }

    /// Only person clusters can be selected or used as a gallery filter.
    pub fn is_selectable(self) -> bool {
        !self.is_sentinel()
    }

    /// Display title for this cluster.
    pub fn title(self) -> String {
        match self.kind() {
            ClusterKind::Person(n) => format!("Person {}", n),
            ClusterKind::Unassigned => "Unidentified faces".to_string(),
            ClusterKind::Processing => "Processing".to_string(),
        }
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ClusterId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for ClusterId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(ClusterId)
            .map_err(|_| ModelError::InvalidClusterId(s.to_string()))
    }
}

/// A single sample face within a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Sample {
    /// Primary key of the sample face
    pub face_id: FaceId,
    /// URL of the image containing the face
    pub sample_blob_url: String,
    /// Face location in the source image
    pub sample_bbox: BoundingBox,
}

/// Summary of one face cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Cluster {
    pub cluster_id: ClusterId,
    /// Total faces in this cluster (not just the sampled ones)
    pub face_count: u64,
    /// Random sample faces, at most the requested sample size
    #[serde(default)]
    pub samples: Vec<Sample>,
}

impl Cluster {
    pub fn new(cluster_id: impl Into<ClusterId>, face_count: u64, samples: Vec<Sample>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            face_count,
            samples,
        }
    }

    pub fn title(&self) -> String {
        self.cluster_id.title()
    }

    /// Title with the face count, e.g. `Person 3 (12 photos)`.
    pub fn caption(&self) -> String {
        let unit = if self.face_count == 1 { "photo" } else { "photos" };
        format!("{} ({} {})", self.title(), self.face_count, unit)
    }

    pub fn is_selectable(&self) -> bool {
        self.cluster_id.is_selectable()
    }

    /// Whether the displayed sample rotates over time.
    pub fn cycles(&self) -> bool {
        self.samples.len() > 1
    }
}
