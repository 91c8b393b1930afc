use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{LaneID, LaneSpec, NetworkConfig, NodeID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoadID(pub usize);

impl fmt::Display for RoadID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Road #{}", self.0)
    }
}

/// Everything about a road besides its nodes. Roads without a name get one allocated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadSpec {
    pub name: Option<String>,
    pub lanes: Vec<LaneSpec>,
}

impl RoadSpec {
    pub fn new(lanes: Vec<LaneSpec>) -> RoadSpec {
        RoadSpec { name: None, lanes }
    }

    /// A single lane following the centerline.
    pub fn street(config: &NetworkConfig) -> RoadSpec {
        RoadSpec::new(vec![LaneSpec::new(0.0, config.default_lane_width)])
    }

    /// One lane on each side of the centerline, going opposite ways.
    pub fn trunk(config: &NetworkConfig) -> RoadSpec {
        RoadSpec::new(vec![
            LaneSpec::new(config.trunk_lane_offset, config.default_lane_width),
            LaneSpec::new(-config.trunk_lane_offset, config.default_lane_width).reversed(),
        ])
    }

    pub fn named<S: Into<String>>(mut self, name: S) -> RoadSpec {
        self.name = Some(name.into());
        self
    }
}

/// A road is an ordered list of nodes forming its centerline, plus lanes running along it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Road {
    pub id: RoadID,
    pub name: String,
    pub(crate) nodes: Vec<NodeID>,
    pub(crate) lanes: Vec<LaneID>,
}

impl Road {
    pub fn nodes(&self) -> &Vec<NodeID> {
        &self.nodes
    }

    pub fn lanes(&self) -> &Vec<LaneID> {
        &self.lanes
    }

    /// Does the road come back to where it started?
    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }
}
