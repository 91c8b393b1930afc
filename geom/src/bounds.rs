use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{GeometryError, Pt3D};

/// An axis-aligned box. The two corners are always normalized, so `origin` holds the minimum of
/// every component and `corner` the maximum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    origin: Pt3D,
    corner: Pt3D,
}

impl BoundingBox {
    pub fn new(pt1: Pt3D, pt2: Pt3D) -> BoundingBox {
        BoundingBox {
            origin: pt1.min(pt2),
            corner: pt1.max(pt2),
        }
    }

    /// Merges many boxes into one covering all of them. Fails for an empty input.
    pub fn from_boxes(boxes: &[BoundingBox]) -> Result<BoundingBox> {
        let mut iter = boxes.iter();
        let first = match iter.next() {
            Some(b) => *b,
            None => return Err(GeometryError::NotEnoughPoints(0).into()),
        };
        Ok(iter.fold(first, |acc, b| acc.merge(b)))
    }

    pub fn origin(&self) -> Pt3D {
        self.origin
    }

    pub fn corner(&self) -> Pt3D {
        self.corner
    }

    pub fn width(&self) -> f64 {
        self.corner.x() - self.origin.x()
    }

    pub fn height(&self) -> f64 {
        self.corner.y() - self.origin.y()
    }

    pub fn merge(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            origin: self.origin.min(other.origin),
            corner: self.corner.max(other.corner),
        }
    }

    pub fn includes_point(&self, pt: Pt3D) -> bool {
        pt.x() >= self.origin.x()
            && pt.x() <= self.corner.x()
            && pt.y() >= self.origin.y()
            && pt.y() <= self.corner.y()
    }

    pub fn translate(&self, delta: Pt3D) -> BoundingBox {
        BoundingBox {
            origin: self.origin + delta,
            corner: self.corner + delta,
        }
    }
}
