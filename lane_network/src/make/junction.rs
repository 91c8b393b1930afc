use std::collections::{BTreeMap, HashMap};

use geom::{Circle, Pt3D};

use crate::builders::GeometryBuilder;
use crate::{LaneGeometry, NodeID, RoadID, Waypoint, WaypointConnection, WaypointRole};

/// Radii tried first, in order. Each one has to connect every pair of lanes on its own.
pub const STRICT_RADII: [f64; 6] = [5.0, 5.5, 6.0, 4.5, 6.5, 7.0];
// Exit and entry waypoints closer than this can't be connected
const COINCIDENT_DISTANCE: f64 = 1e-2;
// Circle crossings closer than this are the same crossing, reported by two elements
const SAME_CROSSING: f64 = 1e-6;

/// One lane touching the junction.
pub struct JunctionLane<'a> {
    pub geometry: &'a LaneGeometry,
    pub road: RoadID,
    /// How many times the lane should cross a circle around the junction: once for every time
    /// the lane starts or ends there, twice for every time it passes through.
    pub expected_crossings: usize,
    /// The lane can be entered from the junction.
    pub enters: bool,
    /// The lane can be left into the junction.
    pub exits: bool,
}

// Some radius couldn't connect everything.
struct JunctionNotSatisfied;

#[derive(Default)]
struct Crossings {
    exits: BTreeMap<usize, Waypoint>,
    entries: BTreeMap<usize, Waypoint>,
}

/// Connects every lane leaving a junction to every lane of a different road entering it.
///
/// Exits and entries are placed where the lanes cross a circle around the junction. A few
/// radii are tried first, looking for one that works for every pair. If none does, the radius is
/// picked per pair instead, sweeping outwards and then inwards; pairs that still can't be
/// connected are dropped with a warning.
pub struct JunctionBuilder<'a> {
    node: NodeID,
    center: Pt3D,
    lanes: Vec<JunctionLane<'a>>,
    builder: &'a dyn GeometryBuilder,
}

impl<'a> JunctionBuilder<'a> {
    pub fn new(
        node: NodeID,
        center: Pt3D,
        lanes: Vec<JunctionLane<'a>>,
        builder: &'a dyn GeometryBuilder,
    ) -> JunctionBuilder<'a> {
        JunctionBuilder {
            node,
            center,
            lanes,
            builder,
        }
    }

    pub fn build(&self) -> Vec<WaypointConnection> {
        let pairs = self.lane_pairs();
        if pairs.is_empty() {
            return Vec::new();
        }

        for radius in STRICT_RADII {
            match self.attempt(radius, &pairs) {
                Ok(connections) => {
                    debug!("{} resolved with radius {}", self.node, radius);
                    return dedupe_waypoints(connections);
                }
                Err(JunctionNotSatisfied) => {
                    debug!("{} can't be resolved with radius {}", self.node, radius);
                }
            }
        }

        info!(
            "No single radius connects all {} lane pairs at {}, picking one per pair",
            pairs.len(),
            self.node
        );
        dedupe_waypoints(self.adaptive(&pairs))
    }

    // (exit lane, entry lane) indices into self.lanes
    fn lane_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (idx1, from) in self.lanes.iter().enumerate() {
            if !from.exits {
                continue;
            }
            for (idx2, to) in self.lanes.iter().enumerate() {
                if to.enters && from.road != to.road {
                    pairs.push((idx1, idx2));
                }
            }
        }
        pairs
    }

    fn attempt(
        &self,
        radius: f64,
        pairs: &[(usize, usize)],
    ) -> Result<Vec<WaypointConnection>, JunctionNotSatisfied> {
        let crossings = self.crossings_at(radius, true)?;
        let mut connections = Vec::new();
        for (exit_idx, entry_idx) in pairs {
            let exit = crossings.exits.get(exit_idx).ok_or(JunctionNotSatisfied)?;
            let entry = crossings.entries.get(entry_idx).ok_or(JunctionNotSatisfied)?;
            connections.push(
                self.try_connect(exit, entry, true)
                    .ok_or(JunctionNotSatisfied)?,
            );
        }
        Ok(connections)
    }

    fn adaptive(&self, pairs: &[(usize, usize)]) -> Vec<WaypointConnection> {
        let mut found: BTreeMap<(usize, usize), WaypointConnection> = BTreeMap::new();
        // First insist on valid connections, then take whatever works
        for require_valid in [true, false] {
            for radius in adaptive_radii() {
                if pairs.iter().all(|pair| found.contains_key(pair)) {
                    break;
                }
                let crossings = match self.crossings_at(radius, false) {
                    Ok(crossings) => crossings,
                    Err(JunctionNotSatisfied) => continue,
                };
                for pair in pairs {
                    if found.contains_key(pair) {
                        continue;
                    }
                    if let (Some(exit), Some(entry)) =
                        (crossings.exits.get(&pair.0), crossings.entries.get(&pair.1))
                    {
                        if let Some(connection) = self.try_connect(exit, entry, require_valid) {
                            found.insert(*pair, connection);
                        }
                    }
                }
            }
        }

        let mut connections = Vec::new();
        for pair in pairs {
            match found.remove(pair) {
                Some(connection) => connections.push(connection),
                None => warn!(
                    "Can't connect {} to {} at {}, skipping it",
                    self.lanes[pair.0].geometry.lane(),
                    self.lanes[pair.1].geometry.lane(),
                    self.node
                ),
            }
        }
        connections
    }

    // Where every lane crosses a circle around the junction, as exit and entry waypoints. When
    // strict, anything unexpected fails the whole radius; otherwise whatever was found is kept.
    fn crossings_at(&self, radius: f64, strict: bool) -> Result<Crossings, JunctionNotSatisfied> {
        let circle = Circle::new(self.center, radius);
        let mut result = Crossings::default();

        for (idx, lane) in self.lanes.iter().enumerate() {
            let path = lane.geometry.path();
            let mut pts: Vec<Pt3D> = Vec::new();
            for crossing in path.find_circle_intersection(&circle) {
                let pt = crossing.closest_point_to(self.center);
                if !pts.iter().any(|x| x.dist_to(pt) < SAME_CROSSING) {
                    pts.push(pt);
                }
            }
            if pts.len() != lane.expected_crossings {
                if strict {
                    return Err(JunctionNotSatisfied);
                }
                // The crossings that were found can still connect some pairs
                warn!(
                    "{} crosses the radius {} circle around {} {} times, expected {}",
                    lane.geometry.lane(),
                    radius,
                    self.node,
                    pts.len(),
                    lane.expected_crossings
                );
            }

            for pt in pts {
                let heading = match path.heading_at_point(pt) {
                    Ok(heading) => heading,
                    Err(err) => {
                        if strict {
                            return Err(JunctionNotSatisfied);
                        }
                        warn!(
                            "Skipping {} on {} around {}: {}",
                            pt,
                            lane.geometry.lane(),
                            self.node,
                            err
                        );
                        continue;
                    }
                };
                // Reuse any waypoint already there, so the lane doesn't get two almost identical
                // ones
                let (center, heading) = match lane.geometry.waypoint_at(pt) {
                    Some(existing) => (existing.center, existing.heading),
                    None => (pt, heading),
                };
                let towards_junction =
                    Pt3D::from_heading(heading).angle_to(self.center - center).abs() < 90.0;
                let role = if towards_junction {
                    WaypointRole::Exit
                } else {
                    WaypointRole::Entry
                };
                let waypoint = Waypoint::new(lane.geometry.lane(), center, heading, role, self.node);
                match role {
                    WaypointRole::Exit => {
                        result.exits.entry(idx).or_insert(waypoint);
                    }
                    _ => {
                        result.entries.entry(idx).or_insert(waypoint);
                    }
                }
            }
        }
        Ok(result)
    }

    fn try_connect(
        &self,
        exit: &Waypoint,
        entry: &Waypoint,
        require_valid: bool,
    ) -> Option<WaypointConnection> {
        if exit.center.dist_to(entry.center) < COINCIDENT_DISTANCE {
            return None;
        }
        let connector = match self.builder.connect(exit, entry) {
            Ok(connector) => connector,
            Err(err) => {
                debug!(
                    "Can't connect {} to {} at {}: {}",
                    exit.lane, entry.lane, self.node, err
                );
                return None;
            }
        };
        if require_valid && !connector.is_valid_path_connection() {
            return None;
        }
        Some(WaypointConnection::new(*exit, *entry, connector))
    }
}

// Outwards from 5 to 15, then inwards from 4.5 to 0.5
fn adaptive_radii() -> impl Iterator<Item = f64> {
    (0..=20)
        .map(|step| 5.0 + 0.5 * (step as f64))
        .chain((1..=9).map(|step| 5.0 - 0.5 * (step as f64)))
}

// Connections found at different radii may describe the same spot on a lane slightly
// differently. Keep the first version of each.
fn dedupe_waypoints(mut connections: Vec<WaypointConnection>) -> Vec<WaypointConnection> {
    let mut canonical = HashMap::new();
    for connection in &mut connections {
        for waypoint in [&mut connection.start, &mut connection.end] {
            let key = (waypoint.lane, waypoint.center.rounded_to(5));
            *waypoint = *canonical.entry(key).or_insert(*waypoint);
        }
    }
    connections
}
