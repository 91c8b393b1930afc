//! Small road networks shared by the integration tests, along with helpers to inspect what they
//! turn into.

use anyhow::Result;

use geom::Pt3D;
use lane_network::{LaneID, NetworkConfig, NodeID, RoadID, RoadNetwork, RoadSpec};

/// A network along with the handles tests need to poke at it.
pub struct Fixture {
    pub network: RoadNetwork,
    pub roads: Vec<RoadID>,
    pub junction: Option<NodeID>,
}

impl Fixture {
    /// The lanes of one road, in declaration order.
    pub fn lanes(&self, road: usize) -> Vec<LaneID> {
        self.network.road(self.roads[road]).lanes().clone()
    }
}

pub fn pts(raw: &[(f64, f64)]) -> Vec<Pt3D> {
    raw.iter().map(|(x, y)| Pt3D::xy(*x, *y)).collect()
}

/// One single-lane street between two points, with no intersections.
pub fn lone_street() -> Result<Fixture> {
    let mut network = RoadNetwork::new(NetworkConfig::default());
    let spec = RoadSpec::street(&network.config);
    let road = network.add_road_with_points(spec, &pts(&[(0.0, 0.0), (100.0, 0.0)]))?;
    Ok(Fixture {
        network,
        roads: vec![road],
        junction: None,
    })
}

/// Two single-lane streets crossing at the origin: one going east, one going north.
pub fn crossing_streets(config: NetworkConfig) -> Result<Fixture> {
    let mut network = RoadNetwork::new(config);
    let junction = network.add_intersection_at(Pt3D::zero());
    let east = RoadSpec::street(&network.config).named("East");
    let north = RoadSpec::street(&network.config).named("North");
    let r1 = network.add_road_with_points(east, &pts(&[(-100.0, 0.0), (0.0, 0.0), (100.0, 0.0)]))?;
    let r2 =
        network.add_road_with_points(north, &pts(&[(0.0, -100.0), (0.0, 0.0), (0.0, 100.0)]))?;
    Ok(Fixture {
        network,
        roads: vec![r1, r2],
        junction: Some(junction),
    })
}

/// Two-way roads meeting at a 45 degree bend at the origin. The intersection is declared after
/// the roads.
pub fn bending_trunks() -> Result<Fixture> {
    let mut network = RoadNetwork::new(NetworkConfig::default());
    let west = RoadSpec::trunk(&network.config);
    let north_east = RoadSpec::trunk(&network.config);
    let r1 = network.add_road_with_points(west, &pts(&[(-100.0, 0.0), (0.0, 0.0)]))?;
    let r2 = network.add_road_with_points(north_east, &pts(&[(0.0, 0.0), (70.7, 70.7)]))?;
    let junction = network.add_intersection_at(Pt3D::zero());
    Ok(Fixture {
        network,
        roads: vec![r1, r2],
        junction: Some(junction),
    })
}

/// A street arriving at the origin from the west, and two leaving it: one straight ahead, one
/// doubling back the way the first came.
pub fn dead_end_fork() -> Result<Fixture> {
    let mut network = RoadNetwork::new(NetworkConfig::default());
    let junction = network.add_intersection_at(Pt3D::zero());
    let mut roads = Vec::new();
    for line in [
        [(-100.0, 0.0), (0.0, 0.0)],
        [(0.0, 0.0), (100.0, 0.0)],
        [(0.0, 0.0), (-100.0, 0.0)],
    ] {
        let spec = RoadSpec::street(&network.config);
        roads.push(network.add_road_with_points(spec, &pts(&line))?);
    }
    Ok(Fixture {
        network,
        roads,
        junction: Some(junction),
    })
}
