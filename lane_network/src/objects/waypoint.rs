use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use geom::{Line, Path, PathElement, Pt3D};

use crate::{LaneID, NodeID};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WaypointRole {
    /// Just marks a point along a lane.
    Reference,
    /// Where a lane is entered from a junction.
    Entry,
    /// Where a lane is left to cross a junction.
    Exit,
}

/// A point along a lane that connections attach to.
///
/// Two waypoints are the same if they play the same role on the same lane at the same spot
/// (rounded to 5 decimals). The heading and source node don't participate.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Waypoint {
    pub lane: LaneID,
    pub center: Pt3D,
    /// Degrees, the direction of travel along the lane at the center
    pub heading: f64,
    pub role: WaypointRole,
    /// The road node this waypoint was produced for
    pub source: NodeID,
}

impl Waypoint {
    pub fn new(
        lane: LaneID,
        center: Pt3D,
        heading: f64,
        role: WaypointRole,
        source: NodeID,
    ) -> Waypoint {
        Waypoint {
            lane,
            center,
            heading,
            role,
            source,
        }
    }

    pub fn heading_vector(&self) -> Pt3D {
        Pt3D::from_heading(self.heading)
    }

    /// The infinite line through the center along the heading.
    pub fn defining_line(&self) -> Line {
        Line::from_point_and_heading(self.center, self.heading)
    }

    pub fn with_role(mut self, role: WaypointRole) -> Waypoint {
        self.role = role;
        self
    }

    pub fn is_exit(&self) -> bool {
        self.role == WaypointRole::Exit
    }

    pub fn is_entry(&self) -> bool {
        self.role == WaypointRole::Entry
    }
}

impl PartialEq for Waypoint {
    fn eq(&self, other: &Waypoint) -> bool {
        self.role == other.role
            && self.lane == other.lane
            && self.center.rounded_to(5) == other.center.rounded_to(5)
    }
}

impl Eq for Waypoint {}

impl Hash for Waypoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.role.hash(state);
        self.center.rounded_to(5).hash(state);
        self.lane.hash(state);
    }
}

/// The geometry joining two waypoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Connector {
    Element(PathElement),
    Path(Path),
}

impl Connector {
    pub fn elements(&self) -> Vec<PathElement> {
        match self {
            Connector::Element(e) => vec![*e],
            Connector::Path(p) => p.elements().to_vec(),
        }
    }

    pub fn start_point(&self) -> Option<Pt3D> {
        match self {
            Connector::Element(e) => Some(e.start_point()),
            Connector::Path(p) => p.start_point(),
        }
    }

    pub fn end_point(&self) -> Option<Pt3D> {
        match self {
            Connector::Element(e) => Some(e.end_point()),
            Connector::Path(p) => p.end_point(),
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            Connector::Element(e) => e.length(),
            Connector::Path(p) => p.length(),
        }
    }

    pub fn is_valid_path_connection(&self) -> bool {
        match self {
            Connector::Element(e) => e.is_valid_path_connection(),
            Connector::Path(p) => p.is_valid_path_connection(),
        }
    }

    pub fn line_interpolation_points(&self, step: f64) -> Vec<Pt3D> {
        match self {
            Connector::Element(e) => e.line_interpolation_points(step),
            Connector::Path(p) => p.line_interpolation_points(step),
        }
    }
}

/// A directed link from one waypoint to another. Connections between consecutive waypoints of
/// the same lane follow the lane; junction connections cross from one lane to another.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaypointConnection {
    pub start: Waypoint,
    pub end: Waypoint,
    pub connector: Connector,
}

impl WaypointConnection {
    pub fn new(start: Waypoint, end: Waypoint, connector: Connector) -> WaypointConnection {
        WaypointConnection {
            start,
            end,
            connector,
        }
    }

    /// One reference waypoint for every boundary between the connector's elements. Empty when
    /// the connector is a single element.
    pub fn intermediate_waypoints(&self) -> Vec<Waypoint> {
        let elements = self.connector.elements();
        elements
            .iter()
            .take(elements.len().saturating_sub(1))
            .map(|e| {
                Waypoint::new(
                    self.start.lane,
                    e.end_point(),
                    e.end_heading(),
                    WaypointRole::Reference,
                    self.start.source,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use geom::{Arc, LineSegment};

    use super::*;

    fn wp(x: f64, y: f64, role: WaypointRole) -> Waypoint {
        Waypoint::new(LaneID(0), Pt3D::xy(x, y), 0.0, role, NodeID(0))
    }

    #[test]
    fn identity_ignores_heading_and_tiny_differences() {
        let a = wp(1.0, 2.0, WaypointRole::Exit);
        let mut b = wp(1.000_000_1, 2.0, WaypointRole::Exit);
        b.heading = 90.0;
        b.source = NodeID(3);
        assert_eq!(a, b);
        assert_ne!(a, a.with_role(WaypointRole::Entry));
        assert_ne!(a, wp(1.1, 2.0, WaypointRole::Exit));

        let mut other_lane = a;
        other_lane.lane = LaneID(1);
        assert_ne!(a, other_lane);

        let set: HashSet<Waypoint> = vec![a, b, other_lane].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn intermediate_waypoints() {
        let start = wp(0.0, 0.0, WaypointRole::Exit);
        let end = wp(20.0, 10.0, WaypointRole::Entry);

        let single = WaypointConnection::new(
            start,
            end,
            Connector::Element(PathElement::Segment(LineSegment::new(
                Pt3D::xy(0.0, 0.0),
                Pt3D::xy(20.0, 10.0),
            ))),
        );
        assert!(single.intermediate_waypoints().is_empty());

        let arc = Arc::new(Pt3D::xy(10.0, 0.0), 0.0, 10.0, 90.0);
        let path = Path::from_elements(vec![
            PathElement::Segment(LineSegment::new(Pt3D::xy(0.0, 0.0), Pt3D::xy(10.0, 0.0))),
            PathElement::Arc(arc),
        ])
        .unwrap();
        let multi = WaypointConnection::new(start, end, Connector::Path(path));
        let intermediate = multi.intermediate_waypoints();
        assert_eq!(intermediate.len(), 1);
        assert_eq!(intermediate[0].role, WaypointRole::Reference);
        assert_eq!(intermediate[0].lane, LaneID(0));
        assert!(intermediate[0].center.almost_equal_to(Pt3D::xy(10.0, 0.0), 7));
        assert_eq!(multi.connector.length(), 10.0 + arc.length());
    }
}
