use std::fmt;

use serde::{Deserialize, Serialize};

use geom::Pt3D;

use crate::{LaneNode, RoadID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneID(pub usize);

impl fmt::Display for LaneID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Lane #{}", self.0)
    }
}

/// How a road declares one of its lanes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneSpec {
    /// Distance from the road's centerline to the middle of the lane. Positive is to the right of
    /// the road's direction.
    pub offset: f64,
    pub width: f64,
    /// Reversed lanes go against the road's direction, visiting its nodes backwards.
    pub reversed: bool,
}

impl LaneSpec {
    pub fn new(offset: f64, width: f64) -> LaneSpec {
        LaneSpec {
            offset,
            width,
            reversed: false,
        }
    }

    pub fn reversed(mut self) -> LaneSpec {
        self.reversed = true;
        self
    }
}

/// One lane belonging to a road. The geometry is derived lazily from the road and cached here
/// until the network changes.
#[derive(Clone, Debug)]
pub struct Lane {
    pub id: LaneID,
    pub road: RoadID,
    pub offset: f64,
    pub width: f64,
    pub reversed: bool,

    pub(crate) derived: Option<Vec<Pt3D>>,
    pub(crate) nodes: Option<Vec<LaneNode>>,
}

impl Lane {
    pub(crate) fn new(id: LaneID, road: RoadID, spec: LaneSpec) -> Lane {
        Lane {
            id,
            road,
            offset: spec.offset,
            width: spec.width,
            reversed: spec.reversed,
            derived: None,
            nodes: None,
        }
    }

    /// How far the outer edge of the lane is from the road's centerline, on the lane's side.
    pub fn external_offset(&self) -> f64 {
        (self.offset.abs() + self.width / 2.0).copysign(self.offset)
    }

    pub(crate) fn clear_cache(&mut self) {
        self.derived = None;
        self.nodes = None;
    }
}
