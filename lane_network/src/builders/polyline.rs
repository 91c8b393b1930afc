use anyhow::Result;

use geom::{GeometryError, LineSegment, Path, PathElement, CONTIGUITY_DECIMALS};

use super::{dedupe_consecutive, waypoint_at_end, waypoint_at_start, GeometryBuilder, MappedNode};
use crate::{Connector, LaneID, Waypoint};

pub struct PolylineBuilder;

impl GeometryBuilder for PolylineBuilder {
    fn build_path_and_waypoints(
        &self,
        lane: LaneID,
        nodes: &[MappedNode],
    ) -> Result<(Path, Vec<Waypoint>)> {
        let nodes = dedupe_consecutive(nodes);
        if nodes.len() < 2 {
            return Err(GeometryError::NotEnoughPoints(nodes.len()).into());
        }

        let mut path = Path::new();
        let mut waypoints = Vec::new();
        for pair in nodes.windows(2) {
            let element = PathElement::Segment(LineSegment::new(pair[0].pt, pair[1].pt));
            waypoints.push(waypoint_at_start(lane, &element, pair[0].node));
            path.add_element(element)?;
        }
        let last = path.elements()[path.elements().len() - 1];
        waypoints.push(waypoint_at_end(lane, &last, nodes[nodes.len() - 1].node));
        Ok((path, waypoints))
    }

    fn connect(&self, exit: &Waypoint, entry: &Waypoint) -> Result<Connector> {
        if exit.center.almost_equal_to(entry.center, CONTIGUITY_DECIMALS) {
            return Err(GeometryError::Degenerate(format!(
                "can't connect {} to itself",
                exit.center
            ))
            .into());
        }
        Ok(Connector::Element(PathElement::Segment(LineSegment::new(
            exit.center,
            entry.center,
        ))))
    }
}
