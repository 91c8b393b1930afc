//! Different ways of turning the points a lane passes through into drivable geometry, and of
//! connecting two lanes across a junction.

mod lines_and_arcs;
mod polyline;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use geom::{Path, PathElement, Pt3D};

pub use self::lines_and_arcs::LinesAndArcsBuilder;
pub use self::polyline::PolylineBuilder;
use crate::{LaneID, NodeID, Waypoint, WaypointRole};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuilderKind {
    /// Straight segments only
    Polyline,
    /// Straight segments, with tangent arcs smoothing every turn
    LinesAndArcs,
}

impl BuilderKind {
    pub fn builder(self) -> &'static dyn GeometryBuilder {
        match self {
            BuilderKind::Polyline => &PolylineBuilder,
            BuilderKind::LinesAndArcs => &LinesAndArcsBuilder,
        }
    }
}

/// A road node, along with where some lane passes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MappedNode {
    pub node: NodeID,
    pub pt: Pt3D,
}

impl MappedNode {
    pub fn new(node: NodeID, pt: Pt3D) -> MappedNode {
        MappedNode { node, pt }
    }
}

pub trait GeometryBuilder {
    /// Produces the lane's path through the mapped nodes, plus one reference waypoint for every
    /// element boundary (and both ends), in order.
    fn build_path_and_waypoints(
        &self,
        lane: LaneID,
        nodes: &[MappedNode],
    ) -> Result<(Path, Vec<Waypoint>)>;

    /// The geometry leading from a lane's exit to another lane's entry.
    fn connect(&self, exit: &Waypoint, entry: &Waypoint) -> Result<crate::Connector>;
}

fn waypoint_at_start(lane: LaneID, element: &PathElement, node: NodeID) -> Waypoint {
    Waypoint::new(
        lane,
        element.start_point(),
        element.start_heading(),
        WaypointRole::Reference,
        node,
    )
}

fn waypoint_at_end(lane: LaneID, element: &PathElement, node: NodeID) -> Waypoint {
    Waypoint::new(
        lane,
        element.end_point(),
        element.end_heading(),
        WaypointRole::Reference,
        node,
    )
}

// Consecutive nodes mapped to the same place would produce zero-length elements.
fn dedupe_consecutive(nodes: &[MappedNode]) -> Vec<MappedNode> {
    let mut result: Vec<MappedNode> = Vec::new();
    for node in nodes {
        if let Some(last) = result.last() {
            if last.pt.almost_equal_to(node.pt, geom::CONTIGUITY_DECIMALS) {
                continue;
            }
        }
        result.push(*node);
    }
    result
}
