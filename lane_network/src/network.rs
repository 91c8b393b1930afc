//! The road network: an arena of roads, nodes and lanes, plus everything lazily derived from
//! them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{anyhow, bail, Context, Result};

use geom::{BoundingBox, GeometryError, HashablePt3D, LineSegment, Path, Pt3D, EPSILON};

use crate::builders::{BuilderKind, MappedNode};
use crate::make::{offset_centerline, JunctionBuilder, JunctionLane};
use crate::{
    Lane, LaneGeometry, LaneID, LaneNode, NameAllocator, NetworkConfig, NodeID, NodeKind, Road,
    RoadID, RoadNode, RoadSpec, Waypoint, WaypointConnection,
};

// Crossings between lanes closer than this are the same crossing
const SAME_CROSSING: f64 = 1e-5;

/// Owns every road, node and lane. Geometry is computed on demand and cached until something
/// changes the network; junctions are resolved separately for every kind of builder, the first
/// time a query needs them.
pub struct RoadNetwork {
    pub config: NetworkConfig,
    names: NameAllocator,

    roads: Vec<Road>,
    lanes: Vec<Lane>,
    nodes: BTreeMap<NodeID, RoadNode>,
    next_node: usize,
    intersections: HashMap<HashablePt3D, NodeID>,

    geometries: BTreeMap<(BuilderKind, LaneID), LaneGeometry>,
    junctions: BTreeMap<(BuilderKind, NodeID), Vec<WaypointConnection>>,
}

impl RoadNetwork {
    pub fn new(config: NetworkConfig) -> RoadNetwork {
        RoadNetwork {
            config,
            names: NameAllocator::new(),
            roads: Vec::new(),
            lanes: Vec::new(),
            nodes: BTreeMap::new(),
            next_node: 0,
            intersections: HashMap::new(),
            geometries: BTreeMap::new(),
            junctions: BTreeMap::new(),
        }
    }

    pub fn add_road(&mut self, spec: RoadSpec) -> RoadID {
        let id = RoadID(self.roads.len());
        let name = spec.name.unwrap_or_else(|| self.names.next("Road"));
        let mut lanes = Vec::new();
        for lane_spec in spec.lanes {
            let lane = LaneID(self.lanes.len());
            self.lanes.push(Lane::new(lane, id, lane_spec));
            lanes.push(lane);
        }
        self.roads.push(Road {
            id,
            name,
            nodes: Vec::new(),
            lanes,
        });
        id
    }

    /// Appends a point to a road's centerline. Points matching a registered intersection join
    /// it. Repeating the previous point does nothing, and coming back to the first point closes
    /// the road.
    pub fn add_point(&mut self, road: RoadID, pt: Pt3D) -> Result<NodeID> {
        if road.0 >= self.roads.len() {
            bail!("{} doesn't exist", road);
        }
        let key = pt.rounded_to(5);
        let existing = &self.roads[road.0].nodes;
        if let Some(last) = existing.last() {
            if self.nodes[last].center.rounded_to(5) == key {
                return Ok(*last);
            }
        }
        let closing = match existing.first() {
            Some(first) if existing.len() >= 2 && self.nodes[first].center.rounded_to(5) == key => {
                Some(*first)
            }
            _ => None,
        };

        let id = if let Some(id) = closing {
            id
        } else if let Some(id) = self.intersections.get(&key).cloned() {
            id
        } else {
            let name = self.names.next("Node");
            self.new_node(name, pt, NodeKind::Simple)
        };
        if let Some(node) = self.nodes.get_mut(&id) {
            node.roads.insert(road);
        }
        self.roads[road.0].nodes.push(id);
        self.invalidate_geometry();
        Ok(id)
    }

    pub fn add_road_with_points(&mut self, spec: RoadSpec, pts: &[Pt3D]) -> Result<RoadID> {
        let road = self.add_road(spec);
        for pt in pts {
            self.add_point(road, *pt)?;
        }
        Ok(road)
    }

    /// Declares that every road passing through a point meets there. Works the same before or
    /// after the roads are added; roads added later join the intersection when they reach the
    /// point.
    pub fn add_intersection_at(&mut self, pt: Pt3D) -> NodeID {
        let key = pt.rounded_to(5);
        if let Some(id) = self.intersections.get(&key) {
            return *id;
        }
        let name = self.names.next("Intersection");
        let id = self.new_node(name, pt, NodeKind::Intersection);
        self.intersections.insert(key, id);

        let mut replaced = BTreeSet::new();
        let mut joined = BTreeSet::new();
        for road in &mut self.roads {
            for slot in &mut road.nodes {
                if *slot != id && self.nodes[&*slot].center.rounded_to(5) == key {
                    replaced.insert(*slot);
                    *slot = id;
                    joined.insert(road.id);
                }
            }
        }
        for old in replaced {
            self.nodes.remove(&old);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.roads.extend(joined);
        }
        self.invalidate_geometry();
        id
    }

    /// Drops interior simple nodes where the road turns by at most `angle_tolerance` degrees,
    /// measured from the last node kept. Intersections always stay.
    pub fn trim_redundant_nodes(&mut self, road: RoadID, angle_tolerance: f64) -> Result<()> {
        let nodes = self
            .roads
            .get(road.0)
            .ok_or_else(|| anyhow!("{} doesn't exist", road))?
            .nodes
            .clone();
        if nodes.len() < 3 {
            return Ok(());
        }

        let mut kept = vec![nodes[0]];
        let mut dropped = Vec::new();
        for idx in 1..nodes.len() - 1 {
            let node = &self.nodes[&nodes[idx]];
            let anchor = self.nodes[&kept[kept.len() - 1]].center;
            let next = self.nodes[&nodes[idx + 1]].center;
            let turn = (node.center - anchor).angle_to(next - node.center);
            if !node.is_intersection() && turn.abs() <= angle_tolerance {
                dropped.push(node.id);
            } else {
                kept.push(node.id);
            }
        }
        kept.push(nodes[nodes.len() - 1]);

        if dropped.is_empty() {
            return Ok(());
        }
        debug!("Trimming {} redundant nodes from {}", dropped.len(), road);
        for id in dropped {
            // Closed roads repeat their first node, which is never dropped
            if !kept.contains(&id) {
                self.nodes.remove(&id);
            }
        }
        self.roads[road.0].nodes = kept;
        self.invalidate_geometry();
        Ok(())
    }

    /// Forgets all derived geometry involving a lane. Since junctions depend on every lane
    /// touching them, everything gets recomputed.
    pub fn rebuild_lane(&mut self, lane: LaneID) {
        debug!("Rebuilding {}", lane);
        self.invalidate_geometry();
    }

    pub fn road(&self, id: RoadID) -> &Road {
        &self.roads[id.0]
    }

    pub fn lane(&self, id: LaneID) -> &Lane {
        &self.lanes[id.0]
    }

    pub fn node(&self, id: NodeID) -> &RoadNode {
        &self.nodes[&id]
    }

    pub fn roads(&self) -> &Vec<Road> {
        &self.roads
    }

    pub fn lanes(&self) -> &Vec<Lane> {
        &self.lanes
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RoadNode> {
        self.nodes.values()
    }

    pub fn intersection_at(&self, pt: Pt3D) -> Option<NodeID> {
        self.intersections.get(&pt.rounded_to(5)).cloned()
    }

    /// Every lane of every road passing through the node.
    pub fn involved_lanes(&self, node: NodeID) -> Vec<LaneID> {
        let mut lanes = Vec::new();
        if let Some(node) = self.nodes.get(&node) {
            for road in &node.roads {
                lanes.extend(self.roads[road.0].lanes.iter().cloned());
            }
        }
        lanes
    }

    /// How far the road's lanes reach from its centerline, adding up both sides.
    pub fn road_width(&self, road: RoadID) -> f64 {
        self.roads[road.0]
            .lanes
            .iter()
            .map(|l| self.lanes[l.0].external_offset().abs())
            .sum()
    }

    pub fn road_bounding_box(&self, road: RoadID) -> Result<BoundingBox> {
        let width = self.road_width(road);
        let boxes = self.roads[road.0]
            .nodes
            .iter()
            .map(|n| self.nodes[n].bounding_box(width))
            .collect::<Result<Vec<_>>>()?;
        BoundingBox::from_boxes(&boxes)
    }

    /// The road's nodes in the order the lane visits them.
    pub fn lane_road_nodes(&self, lane: LaneID) -> Vec<NodeID> {
        let lane = &self.lanes[lane.0];
        let mut nodes = self.roads[lane.road.0].nodes.clone();
        if lane.reversed {
            nodes.reverse();
        }
        nodes
    }

    /// The lane's polyline, one point per road node, in the lane's direction of travel. Ends
    /// touching an intersection are stretched to meet the lanes continuing from them.
    pub fn derived_geometry(&mut self, lane: LaneID) -> Result<Vec<Pt3D>> {
        if let Some(pts) = &self.lanes[lane.0].derived {
            return Ok(pts.clone());
        }
        let mut pts = self.offset_points(lane)?;
        self.extend_terminals(lane, &mut pts);
        self.lanes[lane.0].derived = Some(pts.clone());
        Ok(pts)
    }

    /// The lane's own view of the road nodes, ordered along the lane. Simple nodes map to the
    /// lane's vertex; intersections map to every distinct point where another road's lane
    /// crosses this one nearby.
    pub fn lane_nodes(&mut self, lane: LaneID) -> Result<Vec<LaneNode>> {
        if let Some(nodes) = &self.lanes[lane.0].nodes {
            return Ok(nodes.clone());
        }

        let pts = self.derived_geometry(lane)?;
        let road_nodes = self.lane_road_nodes(lane);
        let own_road = self.lanes[lane.0].road;
        let mut cumulative = vec![0.0];
        for pair in pts.windows(2) {
            cumulative.push(cumulative[cumulative.len() - 1] + pair[0].dist_to(pair[1]));
        }

        let mut result: Vec<(f64, LaneNode)> = Vec::new();
        for (idx, node) in road_nodes.iter().enumerate() {
            if !self.is_intersection(*node) {
                result.push((
                    cumulative[idx],
                    LaneNode::Simple {
                        center: pts[idx],
                        road_node: *node,
                    },
                ));
                continue;
            }

            // The segments touching this vertex, along with where they start along the lane
            let mut nearby: Vec<(f64, LineSegment)> = Vec::new();
            if idx > 0 {
                nearby.push((cumulative[idx - 1], LineSegment::new(pts[idx - 1], pts[idx])));
            }
            if idx + 1 < pts.len() {
                nearby.push((cumulative[idx], LineSegment::new(pts[idx], pts[idx + 1])));
            }

            let mut crossings: Vec<(f64, Pt3D, Vec<LaneID>)> = Vec::new();
            for other in self.involved_lanes(*node) {
                if self.lanes[other.0].road == own_road {
                    continue;
                }
                let other_pts = match self.derived_geometry(other) {
                    Ok(pts) => pts,
                    Err(err) => {
                        warn!("Ignoring {} at {} for {}: {:#}", other, node, lane, err);
                        continue;
                    }
                };
                for other_seg in other_pts
                    .windows(2)
                    .map(|pair| LineSegment::new(pair[0], pair[1]))
                {
                    for (start_dist, seg) in &nearby {
                        let hit = match seg.find_intersection(&other_seg) {
                            Some(hit) => hit,
                            None => continue,
                        };
                        match crossings
                            .iter_mut()
                            .find(|(_, pt, _)| pt.dist_to(hit) < SAME_CROSSING)
                        {
                            Some((_, _, lanes)) => {
                                if !lanes.contains(&other) {
                                    lanes.push(other);
                                }
                            }
                            None => crossings.push((
                                start_dist + seg.start_point().dist_to(hit),
                                hit,
                                vec![lane, other],
                            )),
                        }
                    }
                }
            }

            if crossings.is_empty() {
                result.push((
                    cumulative[idx],
                    LaneNode::Intersection {
                        center: pts[idx],
                        road_node: *node,
                        lanes: vec![lane],
                    },
                ));
            }
            for (dist, center, lanes) in crossings {
                result.push((
                    dist,
                    LaneNode::Intersection {
                        center,
                        road_node: *node,
                        lanes,
                    },
                ));
            }
        }

        result.sort_by(|a, b| a.0.total_cmp(&b.0));
        let nodes: Vec<LaneNode> = result.into_iter().map(|(_, n)| n).collect();
        self.lanes[lane.0].nodes = Some(nodes.clone());
        Ok(nodes)
    }

    /// Waypoints along the lane, with every junction it touches resolved, using the configured
    /// builder.
    pub fn lane_waypoints(&mut self, lane: LaneID) -> Result<Vec<Waypoint>> {
        let kind = self.config.geometry_builder;
        self.lane_waypoints_using(kind, lane)
    }

    pub fn lane_waypoints_using(&mut self, kind: BuilderKind, lane: LaneID) -> Result<Vec<Waypoint>> {
        self.resolve_lane(kind, lane)?;
        Ok(self.lane_geometry(kind, lane)?.waypoints().clone())
    }

    pub fn lane_path_using(&mut self, kind: BuilderKind, lane: LaneID) -> Result<Path> {
        self.resolve_lane(kind, lane)?;
        Ok(self.lane_geometry(kind, lane)?.path().clone())
    }

    /// Connections between consecutive waypoints of the lane.
    pub fn inner_connections_using(
        &mut self,
        kind: BuilderKind,
        lane: LaneID,
    ) -> Result<Vec<WaypointConnection>> {
        self.resolve_lane(kind, lane)?;
        Ok(self.lane_geometry(kind, lane)?.inner_connections().clone())
    }

    /// Connections crossing a junction. Empty for simple nodes.
    pub fn junction_connections(
        &mut self,
        kind: BuilderKind,
        node: NodeID,
    ) -> Result<Vec<WaypointConnection>> {
        if !self.is_intersection(node) {
            return Ok(Vec::new());
        }
        self.resolve_junction(kind, node)?;
        Ok(self
            .junctions
            .get(&(kind, node))
            .cloned()
            .unwrap_or_default())
    }

    /// Where a vehicle at some waypoint can go next through the junction the waypoint belongs
    /// to, never staying on the same lane.
    pub fn connected_waypoints(
        &mut self,
        kind: BuilderKind,
        waypoint: &Waypoint,
    ) -> Result<Vec<Waypoint>> {
        Ok(self
            .junction_connections(kind, waypoint.source)?
            .into_iter()
            .filter(|c| c.start == *waypoint && c.end.lane != waypoint.lane)
            .map(|c| c.end)
            .collect())
    }

    /// Resolves every junction for one kind of builder, so the results can be read through
    /// `geometry` and `resolved_junction`.
    pub fn resolve_all(&mut self, kind: BuilderKind) -> Result<()> {
        for idx in 0..self.lanes.len() {
            self.resolve_lane(kind, LaneID(idx))?;
        }
        info!(
            "Resolved {} lanes and {} junctions using {:?}",
            self.lanes.len(),
            self.junctions.keys().filter(|(k, _)| *k == kind).count(),
            kind
        );
        Ok(())
    }

    pub fn geometry(&self, kind: BuilderKind, lane: LaneID) -> Option<&LaneGeometry> {
        self.geometries.get(&(kind, lane))
    }

    pub fn resolved_junction(
        &self,
        kind: BuilderKind,
        node: NodeID,
    ) -> Option<&Vec<WaypointConnection>> {
        self.junctions.get(&(kind, node))
    }

    fn new_node(&mut self, name: String, center: Pt3D, kind: NodeKind) -> NodeID {
        let id = NodeID(self.next_node);
        self.next_node += 1;
        self.nodes.insert(
            id,
            RoadNode {
                id,
                name,
                center,
                kind,
                roads: BTreeSet::new(),
            },
        );
        id
    }

    fn is_intersection(&self, node: NodeID) -> bool {
        self.nodes
            .get(&node)
            .map(|n| n.is_intersection())
            .unwrap_or(false)
    }

    fn invalidate_geometry(&mut self) {
        for lane in &mut self.lanes {
            lane.clear_cache();
        }
        self.geometries.clear();
        self.junctions.clear();
    }

    fn lane_geometry(&self, kind: BuilderKind, lane: LaneID) -> Result<&LaneGeometry> {
        self.geometries
            .get(&(kind, lane))
            .ok_or_else(|| anyhow!("no {:?} geometry for {}", kind, lane))
    }

    // The raw offset of the road's centerline, in the lane's direction
    fn offset_points(&self, lane: LaneID) -> Result<Vec<Pt3D>> {
        let lane = &self.lanes[lane.0];
        let road = &self.roads[lane.road.0];
        if road.nodes.len() < 2 {
            return Err(GeometryError::NotEnoughPoints(road.nodes.len()).into());
        }
        let centerline: Vec<Pt3D> = road.nodes.iter().map(|n| self.nodes[n].center).collect();
        let mut pts = offset_centerline(&centerline, lane.offset)
            .with_context(|| format!("offsetting {} of {}", lane.id, road.name))?;
        if lane.reversed {
            pts.reverse();
        }
        Ok(pts)
    }

    // Where a lane ends at an intersection, stretch its last segment until it meets a lane of
    // another road starting there. Likewise for the start. Lanes without usable geometry of
    // their own don't count.
    fn extend_terminals(&self, lane: LaneID, pts: &mut [Pt3D]) {
        let n = pts.len();
        if n < 2 {
            return;
        }
        let nodes = self.lane_road_nodes(lane);
        let own_road = self.lanes[lane.0].road;
        let own_reach = self.road_width(own_road);

        if self.is_intersection(nodes[n - 1]) {
            let boundary = LineSegment::new(pts[n - 2], pts[n - 1]);
            let mut candidates = Vec::new();
            for other in self.involved_lanes(nodes[n - 1]) {
                let other_road = self.lanes[other.0].road;
                if other_road == own_road
                    || self.lane_road_nodes(other).first() != Some(&nodes[n - 1])
                {
                    continue;
                }
                let other_pts = match self.offset_points(other) {
                    Ok(pts) => pts,
                    Err(err) => {
                        warn!("Not extending {} towards {}: {:#}", lane, other, err);
                        continue;
                    }
                };
                let reach = own_reach.max(self.road_width(other_road));
                // Walk backwards from the other lane's start
                candidates.push((
                    LineSegment::new(other_pts[1], other_pts[0]).extended_by(reach),
                    reach,
                ));
            }
            if let Some(hit) = nearest_hit_beyond(&boundary, &candidates) {
                pts[n - 1] = hit;
            }
        }

        if self.is_intersection(nodes[0]) {
            let boundary = LineSegment::new(pts[1], pts[0]);
            let mut candidates = Vec::new();
            for other in self.involved_lanes(nodes[0]) {
                let other_road = self.lanes[other.0].road;
                if other_road == own_road || self.lane_road_nodes(other).last() != Some(&nodes[0]) {
                    continue;
                }
                let other_pts = match self.offset_points(other) {
                    Ok(pts) => pts,
                    Err(err) => {
                        warn!("Not extending {} towards {}: {:#}", lane, other, err);
                        continue;
                    }
                };
                let m = other_pts.len();
                let reach = own_reach.max(self.road_width(other_road));
                candidates.push((
                    LineSegment::new(other_pts[m - 2], other_pts[m - 1]).extended_by(reach),
                    reach,
                ));
            }
            if let Some(hit) = nearest_hit_beyond(&boundary, &candidates) {
                pts[0] = hit;
            }
        }
    }

    fn ensure_geometry(&mut self, kind: BuilderKind, lane: LaneID) -> Result<()> {
        if self.geometries.contains_key(&(kind, lane)) {
            return Ok(());
        }
        let pts = self.derived_geometry(lane)?;
        let road_nodes = self.lane_road_nodes(lane);
        let mapped: Vec<MappedNode> = road_nodes
            .iter()
            .zip(pts)
            .map(|(node, pt)| MappedNode::new(*node, pt))
            .collect();
        let intersections: BTreeSet<NodeID> = road_nodes
            .into_iter()
            .filter(|n| self.is_intersection(*n))
            .collect();
        let geometry = LaneGeometry::build(kind.builder(), lane, &mapped, intersections)
            .with_context(|| format!("building {:?} geometry for {}", kind, lane))?;
        self.geometries.insert((kind, lane), geometry);
        Ok(())
    }

    fn resolve_lane(&mut self, kind: BuilderKind, lane: LaneID) -> Result<()> {
        self.ensure_geometry(kind, lane)?;
        let unresolved = self.lane_geometry(kind, lane)?.unresolved_intersections().clone();
        for node in unresolved {
            self.resolve_junction(kind, node)?;
        }
        Ok(())
    }

    fn resolve_junction(&mut self, kind: BuilderKind, node: NodeID) -> Result<()> {
        if self.junctions.contains_key(&(kind, node)) {
            return Ok(());
        }
        // Lanes that can't be built are left out, instead of taking the whole junction down
        let mut lanes = Vec::new();
        for lane in self.involved_lanes(node) {
            match self.ensure_geometry(kind, lane) {
                Ok(()) => lanes.push(lane),
                Err(err) => warn!("Leaving {} out of {}: {:#}", lane, node, err),
            }
        }
        let center = self.nodes[&node].center;

        let connections = {
            let mut junction_lanes = Vec::new();
            for lane in &lanes {
                let road_nodes = self.lane_road_nodes(*lane);
                let last = road_nodes.len() - 1;
                let mut expected_crossings = 0;
                let mut enters = false;
                let mut exits = false;
                for (idx, n) in road_nodes.iter().enumerate() {
                    if *n != node {
                        continue;
                    }
                    if idx == 0 {
                        expected_crossings += 1;
                        enters = true;
                    } else if idx == last {
                        expected_crossings += 1;
                        exits = true;
                    } else {
                        expected_crossings += 2;
                        enters = true;
                        exits = true;
                    }
                }
                junction_lanes.push(JunctionLane {
                    geometry: self.lane_geometry(kind, *lane)?,
                    road: self.lanes[lane.0].road,
                    expected_crossings,
                    enters,
                    exits,
                });
            }
            JunctionBuilder::new(node, center, junction_lanes, kind.builder()).build()
        };

        let mut per_lane: BTreeMap<LaneID, Vec<Waypoint>> =
            lanes.iter().map(|l| (*l, Vec::new())).collect();
        for connection in &connections {
            for waypoint in [connection.start, connection.end] {
                let list = per_lane.entry(waypoint.lane).or_insert_with(Vec::new);
                if !list.contains(&waypoint) {
                    list.push(waypoint);
                }
            }
        }
        for (lane, waypoints) in per_lane {
            self.geometries
                .get_mut(&(kind, lane))
                .ok_or_else(|| anyhow!("no {:?} geometry for {}", kind, lane))?
                .resolve_intersection(node, waypoints)
                .with_context(|| format!("resolving {} on {}", node, lane))?;
        }
        debug!(
            "{} has {} connections using {:?}",
            node,
            connections.len(),
            kind
        );
        self.junctions.insert((kind, node), connections);
        Ok(())
    }
}

// The point closest to the end of the boundary, among all the places past its end where it
// would meet one of the candidates if extended by their reach.
fn nearest_hit_beyond(boundary: &LineSegment, candidates: &[(LineSegment, f64)]) -> Option<Pt3D> {
    let end = boundary.end_point();
    let mut best: Option<Pt3D> = None;
    for (candidate, reach) in candidates {
        let extended = boundary.extended_by(*reach);
        if let Some(hit) = extended.find_intersection(candidate) {
            if boundary.start_point().dist_to(hit) < boundary.length() - EPSILON {
                continue;
            }
            if best.map(|b| end.dist_to(hit) < end.dist_to(b)).unwrap_or(true) {
                best = Some(hit);
            }
        }
    }
    best
}
