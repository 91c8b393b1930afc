use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use anyhow::{bail, Result};

use geom::{HashablePt3D, Path, Pt3D};

use crate::builders::{GeometryBuilder, MappedNode};
use crate::{Connector, LaneID, NodeID, Waypoint, WaypointConnection, WaypointRole};

/// The drivable geometry of one lane, as produced by one kind of builder. The path always has
/// exactly one waypoint at each element boundary (and both ends), and one inner connection per
/// element.
///
/// Until every intersection the lane crosses is resolved, the waypoints only describe the lane's
/// own shape. Resolving a junction adds its exit and entry waypoints and recuts the path there.
#[derive(Clone, Debug)]
pub struct LaneGeometry {
    lane: LaneID,
    path: Path,
    waypoints: Vec<Waypoint>,
    index: HashMap<HashablePt3D, usize>,
    unresolved: BTreeSet<NodeID>,
    inner_connections: Vec<WaypointConnection>,
}

impl LaneGeometry {
    pub fn build(
        builder: &dyn GeometryBuilder,
        lane: LaneID,
        nodes: &[MappedNode],
        intersections: BTreeSet<NodeID>,
    ) -> Result<LaneGeometry> {
        let (mut path, waypoints) = builder.build_path_and_waypoints(lane, nodes)?;
        path.simplify();
        let waypoints = waypoints_on_vertices(&path, waypoints);
        let mut geometry = LaneGeometry {
            lane,
            path,
            waypoints,
            index: HashMap::new(),
            unresolved: intersections,
            inner_connections: Vec::new(),
        };
        geometry.rebuild_derived()?;
        Ok(geometry)
    }

    pub fn lane(&self) -> LaneID {
        self.lane
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn waypoints(&self) -> &Vec<Waypoint> {
        &self.waypoints
    }

    pub fn inner_connections(&self) -> &Vec<WaypointConnection> {
        &self.inner_connections
    }

    pub fn unresolved_intersections(&self) -> &BTreeSet<NodeID> {
        &self.unresolved
    }

    pub fn is_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }

    pub fn waypoint_at(&self, pt: Pt3D) -> Option<&Waypoint> {
        self.index
            .get(&pt.rounded_to(5))
            .map(|idx| &self.waypoints[*idx])
    }

    /// Merges the waypoints a junction produced for this lane, in order along the lane. A new
    /// waypoint landing on an existing reference waypoint just gives it a role instead. Resolving
    /// the same node twice does nothing.
    pub fn resolve_intersection(&mut self, node: NodeID, new_waypoints: Vec<Waypoint>) -> Result<()> {
        if !self.unresolved.remove(&node) {
            return Ok(());
        }

        let mut additions: Vec<(f64, Waypoint)> = Vec::new();
        for waypoint in new_waypoints {
            if let Some(idx) = self.index.get(&waypoint.center.rounded_to(5)).cloned() {
                let existing = &mut self.waypoints[idx];
                if existing.role == WaypointRole::Reference {
                    existing.role = waypoint.role;
                }
                continue;
            }
            additions.push((self.path.offset_for_point(waypoint.center)?, waypoint));
        }
        if additions.is_empty() {
            return self.rebuild_derived();
        }
        additions.sort_by(|a, b| a.0.total_cmp(&b.0));

        // Existing waypoints are already in order, so each lookup can start from the previous
        // one. That disambiguates the start and end of closed lanes.
        let mut existing: Vec<(f64, Waypoint)> = Vec::new();
        let mut last_offset = 0.0;
        for waypoint in &self.waypoints {
            last_offset = self.path.offset_for_point_from(waypoint.center, last_offset)?;
            existing.push((last_offset, *waypoint));
        }

        let mut merged = Vec::with_capacity(existing.len() + additions.len());
        let mut existing = existing.into_iter().peekable();
        let mut additions = additions.into_iter().peekable();
        loop {
            let take_existing = match (existing.peek(), additions.peek()) {
                (Some(a), Some(b)) => a.0.total_cmp(&b.0) != Ordering::Greater,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_existing {
                existing.next()
            } else {
                additions.next()
            };
            if let Some((_, waypoint)) = next {
                merged.push(waypoint);
            }
        }

        let centers: Vec<Pt3D> = merged.iter().map(|w| w.center).collect();
        self.path.split_in(&centers)?;
        self.waypoints = merged;
        self.rebuild_derived()
    }

    fn rebuild_derived(&mut self) -> Result<()> {
        let elements = self.path.elements();
        if self.waypoints.len() != elements.len() + 1 {
            bail!(
                "{} has {} waypoints for {} path elements",
                self.lane,
                self.waypoints.len(),
                elements.len()
            );
        }

        self.index = self
            .waypoints
            .iter()
            .enumerate()
            .map(|(idx, w)| (w.center.rounded_to(5), idx))
            .collect();
        self.inner_connections = elements
            .iter()
            .enumerate()
            .map(|(idx, element)| {
                WaypointConnection::new(
                    self.waypoints[idx],
                    self.waypoints[idx + 1],
                    Connector::Element(*element),
                )
            })
            .collect();
        Ok(())
    }
}

// Simplifying the path merges some elements, so the waypoints at the old boundaries have to go.
fn waypoints_on_vertices(path: &Path, waypoints: Vec<Waypoint>) -> Vec<Waypoint> {
    let vertices = path.vertices();
    let mut next_vertex = 0;
    let mut result = Vec::new();
    for waypoint in waypoints {
        if let Some(offset) = vertices[next_vertex.min(vertices.len())..]
            .iter()
            .position(|pt| pt.almost_equal_to(waypoint.center, 5))
        {
            next_vertex += offset + 1;
            result.push(waypoint);
        }
    }
    result
}
