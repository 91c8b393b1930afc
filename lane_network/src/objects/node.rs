use std::collections::BTreeSet;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{BoundingBox, GeometryError, Pt3D};

use crate::RoadID;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeID(pub usize);

impl fmt::Display for NodeID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Node #{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Just a vertex along one road's centerline.
    Simple,
    /// Shared by every road passing through the same point. Lanes meeting here get connected to
    /// each other.
    Intersection,
}

/// A point on a road's centerline. Intersections are identified by their center, rounded to 5
/// decimals (elevation included).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoadNode {
    pub id: NodeID,
    pub name: String,
    pub center: Pt3D,
    pub kind: NodeKind,
    pub(crate) roads: BTreeSet<RoadID>,
}

impl RoadNode {
    pub fn is_intersection(&self) -> bool {
        self.kind == NodeKind::Intersection
    }

    /// Every road passing through this node. Just one for simple nodes.
    pub fn roads(&self) -> &BTreeSet<RoadID> {
        &self.roads
    }

    /// A square around the center, `width` meters across.
    pub fn bounding_box(&self, width: f64) -> Result<BoundingBox> {
        if width < 0.0 {
            return Err(GeometryError::NegativeWidth(width).into());
        }
        let half = Pt3D::xy(width / 2.0, width / 2.0);
        Ok(BoundingBox::new(self.center - half, self.center + half))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: f64, y: f64) -> RoadNode {
        RoadNode {
            id: NodeID(0),
            name: "Node_1".to_string(),
            center: Pt3D::xy(x, y),
            kind: NodeKind::Simple,
            roads: BTreeSet::new(),
        }
    }

    #[test]
    fn bounding_boxes() {
        let b = node(10.0, 20.0).bounding_box(4.0).unwrap();
        assert_eq!(b.origin(), Pt3D::xy(8.0, 18.0));
        assert_eq!(b.corner(), Pt3D::xy(12.0, 22.0));

        let empty = node(10.0, 20.0).bounding_box(0.0).unwrap();
        assert_eq!(empty.width(), 0.0);

        assert!(node(0.0, 0.0).bounding_box(-1.0).is_err());
    }
}
