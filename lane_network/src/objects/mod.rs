pub mod lane;
pub mod lane_node;
pub mod node;
pub mod road;
pub mod waypoint;
