use geom::Pt3D;

use crate::{LaneID, NodeID};

/// A lane's own view of the nodes along it, ordered by distance along the lane.
#[derive(Clone, Debug, PartialEq)]
pub enum LaneNode {
    /// The lane's vertex corresponding to a simple road node.
    Simple { center: Pt3D, road_node: NodeID },
    /// Where this lane crosses other lanes around a road intersection. If nothing crosses, it's
    /// just the lane's own vertex and `lanes` only has this lane.
    Intersection {
        center: Pt3D,
        road_node: NodeID,
        lanes: Vec<LaneID>,
    },
}

impl LaneNode {
    pub fn center(&self) -> Pt3D {
        match self {
            LaneNode::Simple { center, .. } | LaneNode::Intersection { center, .. } => *center,
        }
    }

    pub fn road_node(&self) -> NodeID {
        match self {
            LaneNode::Simple { road_node, .. } | LaneNode::Intersection { road_node, .. } => {
                *road_node
            }
        }
    }

    pub fn is_intersection(&self) -> bool {
        matches!(self, LaneNode::Intersection { .. })
    }
}
