use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box of a cell polygon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec2,
    pub max: Vec2,
}

impl BoundingBox {
    /// Degenerate box covering a single point.
    pub fn point(p: Vec2) -> Self {
        Self { min: p, max: p }
    }

    /// Box spanning `polygon`, or the point box at `fallback` when the
    /// polygon has no vertices.
    pub fn from_polygon(polygon: &[Vec2], fallback: Vec2) -> Self {
        let Some((&first, rest)) = polygon.split_first() else {
            return Self::point(fallback);
        };
        rest.iter().fold(Self::point(first), |bb, &p| Self {
            min: bb.min.min(p),
            max: bb.max.max(p),
        })
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}
