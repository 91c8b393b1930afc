use geom::{PathElement, Pt3D};
use lane_network::{BuilderKind, Connector, NetworkConfig, WaypointRole};
use tests::{bending_trunks, crossing_streets, dead_end_fork, lone_street, pts};

fn assert_near(actual: Pt3D, expected: Pt3D) {
    assert!(
        actual.almost_equal_to(expected, 4),
        "{} isn't close to {}",
        actual,
        expected
    );
}

fn arc_radius(connector: &Connector) -> f64 {
    match connector {
        Connector::Element(PathElement::Arc(arc)) => arc.radius(),
        x => panic!("expected a single arc, got {:?}", x),
    }
}

#[test]
fn lone_street_only_has_reference_waypoints() {
    abstutil::logger::setup();
    let mut f = lone_street().unwrap();
    let lane = f.lanes(0)[0];

    let waypoints = f.network.lane_waypoints(lane).unwrap();
    assert_eq!(waypoints.len(), 2);
    assert!(waypoints.iter().all(|w| w.role == WaypointRole::Reference));
    assert_near(waypoints[0].center, Pt3D::xy(0.0, 0.0));
    assert_near(waypoints[1].center, Pt3D::xy(100.0, 0.0));
    assert!(waypoints[0].heading.abs() < 1e-9);

    let inner = f
        .network
        .inner_connections_using(BuilderKind::LinesAndArcs, lane)
        .unwrap();
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].start, waypoints[0]);
    assert_eq!(inner[0].end, waypoints[1]);

    // Nothing to connect to
    assert!(f
        .network
        .connected_waypoints(BuilderKind::LinesAndArcs, &waypoints[1])
        .unwrap()
        .is_empty());
}

#[test]
fn zero_offset_lanes_follow_the_centerline() {
    let mut f = lone_street().unwrap();
    let lane = f.lanes(0)[0];
    assert_eq!(
        f.network.derived_geometry(lane).unwrap(),
        pts(&[(0.0, 0.0), (100.0, 0.0)])
    );
}

#[test]
fn crossing_streets_turn_with_quarter_circles() {
    abstutil::logger::setup();
    let mut f = crossing_streets(NetworkConfig::default()).unwrap();
    let east = f.lanes(0)[0];
    let north = f.lanes(1)[0];
    let junction = f.junction.unwrap();

    let connections = f
        .network
        .junction_connections(BuilderKind::LinesAndArcs, junction)
        .unwrap();
    assert_eq!(connections.len(), 2);

    let first = &connections[0];
    assert_eq!(first.start.lane, east);
    assert_eq!(first.start.role, WaypointRole::Exit);
    assert_near(first.start.center, Pt3D::xy(-5.0, 0.0));
    assert_eq!(first.end.lane, north);
    assert_eq!(first.end.role, WaypointRole::Entry);
    assert_near(first.end.center, Pt3D::xy(0.0, 5.0));
    assert!((arc_radius(&first.connector) - 5.0).abs() < 1e-6);

    let second = &connections[1];
    assert_eq!(second.start.lane, north);
    assert_near(second.start.center, Pt3D::xy(0.0, -5.0));
    assert_eq!(second.end.lane, east);
    assert_near(second.end.center, Pt3D::xy(5.0, 0.0));
    assert!((arc_radius(&second.connector) - 5.0).abs() < 1e-6);

    // The junction's waypoints get merged into the lane
    let waypoints = f.network.lane_waypoints(east).unwrap();
    let roles: Vec<WaypointRole> = waypoints.iter().map(|w| w.role).collect();
    assert_eq!(
        roles,
        vec![
            WaypointRole::Reference,
            WaypointRole::Exit,
            WaypointRole::Entry,
            WaypointRole::Reference
        ]
    );
    assert_eq!(
        f.network
            .connected_waypoints(BuilderKind::LinesAndArcs, &waypoints[1])
            .unwrap(),
        vec![first.end]
    );
    // Entries lead nowhere through the junction
    assert!(f
        .network
        .connected_waypoints(BuilderKind::LinesAndArcs, &waypoints[2])
        .unwrap()
        .is_empty());
}

#[test]
fn polyline_builder_connects_with_straight_lines() {
    let config = NetworkConfig::from_json(r#"{"geometry_builder": "Polyline"}"#).unwrap();
    let mut f = crossing_streets(config).unwrap();
    let junction = f.junction.unwrap();

    let connections = f
        .network
        .junction_connections(BuilderKind::Polyline, junction)
        .unwrap();
    assert_eq!(connections.len(), 2);
    match connections[0].connector {
        Connector::Element(PathElement::Segment(seg)) => {
            assert_near(seg.start_point(), Pt3D::xy(-5.0, 0.0));
            assert_near(seg.end_point(), Pt3D::xy(0.0, 5.0));
        }
        ref x => panic!("expected a segment, got {:?}", x),
    }

    // The configured builder answers unqualified queries
    let east = f.lanes(0)[0];
    assert_eq!(
        f.network.lane_waypoints(east).unwrap(),
        f.network
            .lane_waypoints_using(BuilderKind::Polyline, east)
            .unwrap()
    );
}

#[test]
fn builders_are_resolved_independently() {
    let mut f = crossing_streets(NetworkConfig::default()).unwrap();
    let east = f.lanes(0)[0];
    let junction = f.junction.unwrap();

    f.network.resolve_all(BuilderKind::Polyline).unwrap();
    assert!(f.network.geometry(BuilderKind::Polyline, east).is_some());
    assert!(f.network.geometry(BuilderKind::LinesAndArcs, east).is_none());
    assert!(f
        .network
        .resolved_junction(BuilderKind::LinesAndArcs, junction)
        .is_none());

    f.network.resolve_all(BuilderKind::LinesAndArcs).unwrap();
    for lane in f.lanes(0).into_iter().chain(f.lanes(1)) {
        for kind in [BuilderKind::Polyline, BuilderKind::LinesAndArcs] {
            assert!(f.network.geometry(kind, lane).unwrap().is_resolved());
        }
    }
    assert_eq!(
        f.network
            .resolved_junction(BuilderKind::LinesAndArcs, junction)
            .unwrap()
            .len(),
        2
    );
}

#[test]
fn resolving_twice_changes_nothing() {
    let mut f = crossing_streets(NetworkConfig::default()).unwrap();
    let east = f.lanes(0)[0];
    let junction = f.junction.unwrap();

    let waypoints = f.network.lane_waypoints(east).unwrap();
    let connections = f
        .network
        .junction_connections(BuilderKind::LinesAndArcs, junction)
        .unwrap();
    f.network.resolve_all(BuilderKind::LinesAndArcs).unwrap();

    assert_eq!(f.network.lane_waypoints(east).unwrap(), waypoints);
    assert_eq!(
        f.network
            .junction_connections(BuilderKind::LinesAndArcs, junction)
            .unwrap(),
        connections
    );
    assert_eq!(
        f.network
            .lane_path_using(BuilderKind::LinesAndArcs, east)
            .unwrap()
            .elements()
            .len(),
        3
    );

    // Rebuilding from scratch lands in the same place
    f.network.rebuild_lane(east);
    assert!(f.network.geometry(BuilderKind::LinesAndArcs, east).is_none());
    assert_eq!(f.network.lane_waypoints(east).unwrap(), waypoints);
}

#[test]
fn bending_trunks_meet_and_connect() {
    abstutil::logger::setup();
    let mut f = bending_trunks().unwrap();
    let west = f.lanes(0);
    let north_east = f.lanes(1);
    let junction = f.junction.unwrap();
    assert_eq!(f.network.node(junction).roads().len(), 2);

    // The outer lanes get stretched until they meet
    let meeting = Pt3D::xy(2.0 * 2_f64.sqrt() - 2.0, -2.0);
    let arriving = f.network.derived_geometry(west[0]).unwrap();
    assert_near(arriving[1], meeting);
    let leaving = f.network.derived_geometry(north_east[0]).unwrap();
    assert_near(leaving[0], meeting);

    let connections = f
        .network
        .junction_connections(BuilderKind::LinesAndArcs, junction)
        .unwrap();
    assert_eq!(connections.len(), 2);

    assert_eq!(connections[0].start.lane, west[0]);
    assert_eq!(connections[0].end.lane, north_east[0]);
    assert_near(connections[0].start.center, Pt3D::xy(-(21_f64.sqrt()), -2.0));
    assert!((arc_radius(&connections[0].connector) - 13.063).abs() < 1e-2);

    assert_eq!(connections[1].start.lane, north_east[1]);
    assert_eq!(connections[1].end.lane, west[1]);
    assert_near(connections[1].end.center, Pt3D::xy(-(21_f64.sqrt()), 2.0));
    assert!((arc_radius(&connections[1].connector) - 9.063).abs() < 1e-2);

    assert!(connections
        .iter()
        .all(|c| c.connector.is_valid_path_connection()));
}

#[test]
fn impossible_turns_are_skipped() {
    abstutil::logger::setup();
    let mut f = dead_end_fork().unwrap();
    let junction = f.junction.unwrap();
    let arriving = f.lanes(0)[0];
    let ahead = f.lanes(1)[0];
    let back = f.lanes(2)[0];

    // Doubling back would need to leave and enter at the same spot, at every radius
    let connections = f
        .network
        .junction_connections(BuilderKind::LinesAndArcs, junction)
        .unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].start.lane, arriving);
    assert_eq!(connections[0].end.lane, ahead);
    match connections[0].connector {
        Connector::Element(PathElement::Segment(seg)) => {
            assert_near(seg.start_point(), Pt3D::xy(-5.0, 0.0));
            assert_near(seg.end_point(), Pt3D::xy(5.0, 0.0));
        }
        ref x => panic!("expected a segment, got {:?}", x),
    }

    let waypoints = f.network.lane_waypoints(back).unwrap();
    assert_eq!(waypoints.len(), 2);
    assert!(waypoints.iter().all(|w| w.role == WaypointRole::Reference));
}

#[test]
fn editing_the_network_rebuilds_lanes() {
    let mut f = lone_street().unwrap();
    let road = f.roads[0];
    let lane = f.lanes(0)[0];
    assert_eq!(f.network.lane_waypoints(lane).unwrap().len(), 2);

    f.network.add_point(road, Pt3D::xy(100.0, 50.0)).unwrap();
    let waypoints = f.network.lane_waypoints(lane).unwrap();
    assert!(waypoints.len() > 2);
    assert_near(waypoints[waypoints.len() - 1].center, Pt3D::xy(100.0, 50.0));
    assert!((waypoints[waypoints.len() - 1].heading - 90.0).abs() < 1e-6);

    // Smoothing the corner makes the lane shorter than the centerline
    let path = f
        .network
        .lane_path_using(BuilderKind::LinesAndArcs, lane)
        .unwrap();
    assert!(path.length() < 150.0);
    assert!(path
        .elements()
        .iter()
        .any(|e| matches!(e, PathElement::Arc(_))));
    let polyline = f
        .network
        .lane_path_using(BuilderKind::Polyline, lane)
        .unwrap();
    assert!((polyline.length() - 150.0).abs() < 1e-9);
}

#[test]
fn trunk_bounds_cover_both_lanes() {
    let f = bending_trunks().unwrap();
    let road = f.roads[0];
    assert_eq!(f.network.road_width(road), 9.0);
    let bounds = f.network.road_bounding_box(road).unwrap();
    assert_near(bounds.origin(), Pt3D::xy(-104.5, -4.5));
    assert_near(bounds.corner(), Pt3D::xy(4.5, 4.5));
}
