use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::BuilderKind;

/// Knobs affecting how a whole network gets built. Any field missing from a serialized config
/// takes its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Which lane geometry builder answers waypoint queries that don't name one.
    pub geometry_builder: BuilderKind,
    /// Width of the lanes created by `RoadSpec::street` and `RoadSpec::trunk`.
    pub default_lane_width: f64,
    /// How far from the centerline each lane of `RoadSpec::trunk` sits.
    pub trunk_lane_offset: f64,
}

impl Default for NetworkConfig {
    fn default() -> NetworkConfig {
        NetworkConfig {
            geometry_builder: BuilderKind::LinesAndArcs,
            default_lane_width: 5.0,
            trunk_lane_offset: 2.0,
        }
    }
}

impl NetworkConfig {
    pub fn from_json(raw: &str) -> Result<NetworkConfig> {
        serde_json::from_str(raw).context("parsing NetworkConfig")
    }
}
