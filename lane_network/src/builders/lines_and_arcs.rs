use anyhow::Result;

use geom::{
    heading_delta, Arc, GeometryError, LineSegment, Path, PathElement, Pt3D, CONTIGUITY_DECIMALS,
    EPSILON,
};

use super::{dedupe_consecutive, waypoint_at_end, waypoint_at_start, GeometryBuilder, MappedNode};
use crate::{Connector, LaneID, Waypoint};

// Turns smaller than this (in degrees) are treated as going straight
const COLLINEAR_DEGREES: f64 = 1e-5;
// The most that's trimmed from a segment on either side of a turn to fit the arc
const MAX_TRIM: f64 = 5.0;
// Straight leftovers shorter than this get absorbed by the arc
const MIN_REMNANT: f64 = 0.25;
const COLLAPSED_SEGMENT: f64 = 1e-8;
// Waypoint headings closer than this (in degrees) are considered parallel
const HEADING_TOLERANCE: f64 = 1e-3;
// Exit and entry distances to where their headings meet can differ this much and still be
// joined by a single arc
const ARC_MISMATCH: f64 = 0.1;

/// Straight segments between the mapped points, with every turn rounded off by a tangent arc.
pub struct LinesAndArcsBuilder;

impl GeometryBuilder for LinesAndArcsBuilder {
    fn build_path_and_waypoints(
        &self,
        lane: LaneID,
        nodes: &[MappedNode],
    ) -> Result<(Path, Vec<Waypoint>)> {
        let nodes = dedupe_consecutive(nodes);
        if nodes.len() < 2 {
            return Err(GeometryError::NotEnoughPoints(nodes.len()).into());
        }
        let closed = nodes.len() > 2 && nodes[0].pt.almost_equal_to(nodes[nodes.len() - 1].pt, 5);

        let mut elements: Vec<PathElement> = Vec::new();
        let mut waypoints: Vec<Waypoint> = Vec::new();
        for idx in 1..nodes.len() {
            let prev = nodes[idx - 1];
            let current = nodes[idx];
            let is_last = idx == nodes.len() - 1;
            let prev_end = elements
                .last()
                .map(|e| e.end_point())
                .unwrap_or(prev.pt);

            let next = if !is_last {
                nodes[idx + 1]
            } else if closed {
                // Wrap around, turning into the first segment
                nodes[1]
            } else {
                let element = PathElement::Segment(LineSegment::new(prev_end, current.pt));
                waypoints.push(waypoint_at_start(lane, &element, prev.node));
                waypoints.push(waypoint_at_end(lane, &element, current.node));
                elements.push(element);
                continue;
            };

            let prev_vec = current.pt - prev.pt;
            let next_vec = next.pt - current.pt;
            let angle = prev_vec.angle_to(next_vec);
            if angle.abs() < COLLINEAR_DEGREES {
                let element = PathElement::Segment(LineSegment::new(prev_end, current.pt));
                waypoints.push(waypoint_at_start(lane, &element, prev.node));
                if is_last {
                    waypoints.push(waypoint_at_end(lane, &element, current.node));
                }
                elements.push(element);
                continue;
            }

            // What's left of the previous segment, walking backwards from the turn
            let remaining_prev = LineSegment::new(current.pt, prev_end);
            let next_segment = LineSegment::new(current.pt, next.pt);
            let next_limit = if is_last {
                // Don't eat past the end of the first element, which gets re-stitched below
                elements
                    .first()
                    .map(|e| current.pt.dist_to(e.end_point()))
                    .unwrap_or(next_segment.length() / 2.0)
            } else {
                next_segment.length() / 2.0
            };
            let delta = remaining_prev
                .length()
                .min(prev_vec.norm() / 2.0)
                .min(next_limit)
                .min(MAX_TRIM);

            let mut new_prev_end = remaining_prev.point_at_offset(delta)?;
            let mut next_start = next_segment.point_at_offset(delta)?;
            let mut prev_segment = LineSegment::new(prev_end, new_prev_end);
            if prev_segment.length() < MIN_REMNANT {
                // Shave a bit to stay inside the segment despite floating point
                let new_delta = delta + prev_segment.length() - 1e-10;
                if next_segment.length() > new_delta {
                    new_prev_end = remaining_prev.point_at_offset(new_delta)?;
                    next_start = next_segment.point_at_offset(new_delta)?;
                    prev_segment = LineSegment::new(prev_end, new_prev_end);
                }
            }

            let chord = new_prev_end.dist_to(next_start);
            let radius = (chord.powi(2) / (2.0 * (1.0 - angle.to_radians().cos()))).sqrt();

            let arc = if prev_segment.length() < COLLAPSED_SEGMENT {
                // Start exactly where the last element ended, so the path stays contiguous
                let heading = elements
                    .last()
                    .map(|e| e.end_heading())
                    .unwrap_or_else(|| prev_vec.heading());
                Arc::new(prev_end, heading, radius, angle)
            } else {
                let segment = PathElement::Segment(prev_segment);
                waypoints.push(waypoint_at_start(lane, &segment, prev.node));
                elements.push(segment);
                Arc::new(new_prev_end, prev_vec.heading(), radius, angle)
            };
            let arc_element = PathElement::Arc(arc);
            waypoints.push(waypoint_at_start(lane, &arc_element, current.node));
            elements.push(arc_element);

            if !arc.end_point().almost_equal_to(next_start, 3) {
                return Err(GeometryError::ToleranceMismatch {
                    what: "arc end and next segment start".to_string(),
                    expected: next_start,
                    actual: arc.end_point(),
                }
                .into());
            }

            if is_last {
                let arc_end = arc.end_point();
                if let Some(PathElement::Segment(first)) = elements.first().copied() {
                    let swallowed = elements
                        .get(1)
                        .map(|e| arc_end.dist_to(e.start_point()) < COLLAPSED_SEGMENT)
                        .unwrap_or(false);
                    if swallowed {
                        elements.remove(0);
                        waypoints.remove(0);
                    } else {
                        let replacement =
                            PathElement::Segment(LineSegment::new(arc_end, first.end_point()));
                        waypoints[0] = waypoint_at_start(lane, &replacement, nodes[0].node);
                        elements[0] = replacement;
                    }
                }
                waypoints.push(waypoint_at_end(lane, &arc_element, current.node));
            }
        }

        Ok((Path::from_elements(elements)?, waypoints))
    }

    fn connect(&self, exit: &Waypoint, entry: &Waypoint) -> Result<Connector> {
        if exit.center.almost_equal_to(entry.center, CONTIGUITY_DECIMALS) {
            return Err(GeometryError::Degenerate(format!(
                "can't connect {} to itself",
                exit.center
            ))
            .into());
        }

        if heading_delta(exit.heading, entry.heading).abs() < HEADING_TOLERANCE {
            let direction = exit.center.heading_to(entry.center);
            if heading_delta(exit.heading, direction).abs() < HEADING_TOLERANCE {
                return Ok(Connector::Element(PathElement::Segment(LineSegment::new(
                    exit.center,
                    entry.center,
                ))));
            }
            return s_curve(exit, entry);
        }

        let meeting = match exit.defining_line().intersection(&entry.defining_line()) {
            Some(pt) => pt,
            // Opposite headings
            None => {
                return Ok(Connector::Element(PathElement::Arc(build_arc(
                    exit.center,
                    exit.heading,
                    entry.center,
                    entry.heading,
                )?)));
            }
        };
        let exit_distance = exit.center.dist_to(meeting);
        let entry_distance = entry.center.dist_to(meeting);
        let mismatch = (exit_distance - entry_distance).abs();

        if mismatch <= ARC_MISMATCH {
            return Ok(Connector::Element(PathElement::Arc(build_arc(
                exit.center,
                exit.heading,
                entry.center,
                entry.heading,
            )?)));
        }

        let elements = if exit_distance > entry_distance {
            // Go straight for a bit, then turn
            let turn_start = exit.center + exit.heading_vector() * mismatch;
            vec![
                PathElement::Segment(LineSegment::new(exit.center, turn_start)),
                PathElement::Arc(build_arc(
                    turn_start,
                    exit.heading,
                    entry.center,
                    entry.heading,
                )?),
            ]
        } else {
            // Turn first, then go straight
            let turn_end = entry.center - entry.heading_vector() * mismatch;
            let arc = build_arc(exit.center, exit.heading, turn_end, entry.heading)?;
            vec![
                PathElement::Arc(arc),
                PathElement::Segment(LineSegment::new(arc.end_point(), entry.center)),
            ]
        };
        Ok(Connector::Path(Path::from_elements(elements)?))
    }
}

// Joins two waypoints facing the same way but on different lines: turn out, cross over in a
// straight line, turn back.
fn s_curve(exit: &Waypoint, entry: &Waypoint) -> Result<Connector> {
    let cutting_line = entry.defining_line().perpendicular_line_at(entry.center);
    let foot = exit
        .defining_line()
        .intersection(&cutting_line)
        .ok_or_else(|| GeometryError::Degenerate("exit line never reaches the entry".to_string()))?;
    let extension = exit.center.dist_to(foot) / 5.0;
    if extension < EPSILON {
        return Err(GeometryError::Degenerate(format!(
            "{} and {} are side by side",
            exit.center, entry.center
        ))
        .into());
    }

    let crossing = LineSegment::new(
        exit.center.project_away(extension, exit.heading),
        entry.center.project_away(extension, entry.heading + 180.0),
    );
    if crossing.length() <= 2.0 * extension {
        return Err(GeometryError::Degenerate(format!(
            "no room for an S-curve between {} and {}",
            exit.center, entry.center
        ))
        .into());
    }
    let crossing = crossing
        .extended_by(-extension)
        .inverted()
        .extended_by(-extension)
        .inverted();

    let start_arc = build_arc(
        exit.center,
        exit.heading,
        crossing.start_point(),
        crossing.heading(),
    )?;
    let end_arc = build_arc(
        crossing.end_point(),
        crossing.heading(),
        entry.center,
        entry.heading,
    )?;
    Ok(Connector::Path(Path::from_elements(vec![
        PathElement::Arc(start_arc),
        PathElement::Segment(crossing),
        PathElement::Arc(end_arc),
    ])?))
}

// The arc leaving `start` with one heading and reaching `end` with another. Only lands exactly on
// `end` when both points are equally far from where the headings meet.
fn build_arc(start: Pt3D, start_heading: f64, end: Pt3D, end_heading: f64) -> Result<Arc> {
    let angle = heading_delta(start_heading, end_heading);
    if angle.abs() < COLLINEAR_DEGREES {
        return Err(GeometryError::Degenerate(format!(
            "no arc goes straight from {} to {}",
            start, end
        ))
        .into());
    }
    let radius = (start.squared_dist_to(end) / (2.0 * (1.0 - angle.to_radians().cos()))).sqrt();
    Ok(Arc::new(start, start_heading, radius, angle))
}
