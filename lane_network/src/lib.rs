//! Turns a graph of road centerlines into drivable lane geometry.
//!
//! Roads are polylines through shared nodes; some nodes are intersections. Every lane is offset
//! from its road's centerline, stretched to meet the lanes it continues into, and then turned into
//! a `Path` of segments and arcs by a `GeometryBuilder`. Around each intersection, a
//! `JunctionBuilder` places exit and entry waypoints on the lanes and connects them, producing a
//! graph of waypoints a vehicle can follow across the whole network.
//!
//! Everything is derived lazily by `RoadNetwork` and cached until the network changes.

#[macro_use]
extern crate log;

mod builders;
mod config;
mod lane_geometry;
mod make;
mod names;
mod network;
mod objects;

pub use crate::builders::{
    BuilderKind, GeometryBuilder, LinesAndArcsBuilder, MappedNode, PolylineBuilder,
};
pub use crate::config::NetworkConfig;
pub use crate::lane_geometry::LaneGeometry;
pub use crate::make::{offset_centerline, JunctionBuilder, JunctionLane, STRICT_RADII};
pub use crate::names::NameAllocator;
pub use crate::network::RoadNetwork;
pub use crate::objects::lane::{Lane, LaneID, LaneSpec};
pub use crate::objects::lane_node::LaneNode;
pub use crate::objects::node::{NodeID, NodeKind, RoadNode};
pub use crate::objects::road::{Road, RoadID, RoadSpec};
pub use crate::objects::waypoint::{Connector, Waypoint, WaypointConnection, WaypointRole};
