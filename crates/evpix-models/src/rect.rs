use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An axis-aligned face box in source-image pixel space.
///
/// Values come straight from the detection pipeline and are not trusted:
/// the box may extend past the image or have a non-positive extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// X coordinate of the top-left corner
    pub x: i64,
    /// Y coordinate of the top-left corner
    pub y: i64,
    /// Width of the box in pixels
    pub width: i64,
    /// Height of the box in pixels
    pub height: i64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { x, y, width, height }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y.saturating_add(self.height)
    }

    /// True when the box has no area and can never produce a crop.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let bbox = BoundingBox::new(10, 20, 50, 60);
        assert_eq!(bbox.right(), 60);
        assert_eq!(bbox.bottom(), 80);
        assert!(!bbox.is_degenerate());
    }

    #[test]
    fn test_degenerate() {
        assert!(BoundingBox::new(0, 0, 0, 10).is_degenerate());
        assert!(BoundingBox::new(0, 0, 10, 0).is_degenerate());
        assert!(BoundingBox::new(0, 0, -5, 10).is_degenerate());
    }

    #[test]
    fn test_deserialize_server_shape() {
        let bbox: BoundingBox =
            serde_json::from_str(r#"{"x":12,"y":7,"width":40,"height":44}"#).unwrap();
        assert_eq!(bbox, BoundingBox::new(12, 7, 40, 44));
    }
}
