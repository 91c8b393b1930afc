use std::f64::consts::PI;
use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    heading_delta, normalize_heading, Circle, CircleIntersection, Crossing, GeometryError,
    LineSegment, PathElement, Pt3D, EPSILON, INCLUDES_BUFFER, MIN_CONNECTION_RADIUS,
};

/// A piece of a circle, described the way a driver would: start somewhere facing some heading,
/// then keep turning with a fixed radius for some degrees. A positive angular length turns left
/// (counter-clockwise), a negative one turns right.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    start: Pt3D,
    theta: f64,
    radius: f64,
    angular_length: f64,
}

fn sign(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}

impl Arc {
    pub fn new(start: Pt3D, theta: f64, radius: f64, angular_length: f64) -> Arc {
        Arc {
            start,
            theta,
            radius,
            angular_length,
        }
    }

    pub fn start_point(&self) -> Pt3D {
        self.start
    }

    pub fn end_point(&self) -> Pt3D {
        self.point_at_angle(self.angular_length)
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn angular_length(&self) -> f64 {
        self.angular_length
    }

    pub fn start_heading(&self) -> f64 {
        normalize_heading(self.theta)
    }

    pub fn end_heading(&self) -> f64 {
        normalize_heading(self.theta + self.angular_length)
    }

    pub fn length(&self) -> f64 {
        (PI * self.radius * self.angular_length / 180.0).abs()
    }

    pub fn center(&self) -> Pt3D {
        let (sin, cos) = self.theta.to_radians().sin_cos();
        self.start + Pt3D::xy(-sin, cos) * (self.radius * sign(self.angular_length))
    }

    pub fn circle(&self) -> Circle {
        Circle::new(self.center(), self.radius)
    }

    // The point reached after turning some degrees from the start.
    fn point_at_angle(&self, degs: f64) -> Pt3D {
        let (sin0, cos0) = self.theta.to_radians().sin_cos();
        let (sin1, cos1) = (self.theta + degs).to_radians().sin_cos();
        self.start + Pt3D::xy(sin1 - sin0, cos0 - cos1) * (self.radius * sign(self.angular_length))
    }

    // Signed degrees, same sign as the angular length
    fn angle_for_distance(&self, dist: f64) -> f64 {
        sign(self.angular_length) * (dist / self.radius).to_degrees()
    }

    // How many degrees to turn from the start to reach the point's direction around the center.
    // Always in the arc's turning direction, so the result shares the sign of the angular length.
    fn angular_offset_for(&self, pt: Pt3D) -> f64 {
        let center = self.center();
        let raw = (self.start - center).angle_to(pt - center);
        let slack = self.angle_slack(INCLUDES_BUFFER);
        if self.angular_length >= 0.0 && raw < -slack {
            raw + 360.0
        } else if self.angular_length < 0.0 && raw > slack {
            raw - 360.0
        } else {
            raw
        }
    }

    fn angle_slack(&self, buffer: f64) -> f64 {
        1e-5 + (buffer / self.radius).to_degrees()
    }

    pub fn point_at_offset(&self, offset: f64) -> Result<Pt3D> {
        let length = self.length();
        if offset < -EPSILON || offset > length + EPSILON {
            return Err(GeometryError::OffsetOutOfRange { offset, length }.into());
        }
        Ok(self.point_at_angle(self.angle_for_distance(offset)))
    }

    pub fn heading_at_offset(&self, offset: f64) -> Result<f64> {
        let length = self.length();
        if offset < -EPSILON || offset > length + EPSILON {
            return Err(GeometryError::OffsetOutOfRange { offset, length }.into());
        }
        Ok(normalize_heading(
            self.theta + self.angle_for_distance(offset),
        ))
    }

    /// Close enough to the circle, and within the angular range. Handles arcs that wrap around
    /// 0 degrees.
    pub fn includes_point(&self, pt: Pt3D, buffer: f64) -> bool {
        if (self.center().dist_to(pt) - self.radius).abs() > buffer {
            return false;
        }
        if self.angular_length.abs() >= 360.0 {
            return true;
        }
        let slack = self.angle_slack(buffer);
        let turned = self.angular_offset_for(pt) * sign(self.angular_length);
        turned >= -slack && turned <= self.angular_length.abs() + slack
    }

    fn checked_angular_offset(&self, pt: Pt3D) -> Result<f64> {
        if !self.includes_point(pt, INCLUDES_BUFFER) {
            return Err(GeometryError::PointNotOnGeometry(pt).into());
        }
        let turned = (self.angular_offset_for(pt) * sign(self.angular_length))
            .clamp(0.0, self.angular_length.abs());
        Ok(turned * sign(self.angular_length))
    }

    pub fn offset_for_point(&self, pt: Pt3D) -> Result<f64> {
        // A full circle starts and ends in the same place; the start wins
        if pt.almost_equal_to(self.start, crate::CONTIGUITY_DECIMALS) {
            return Ok(0.0);
        }
        if pt.almost_equal_to(self.end_point(), crate::CONTIGUITY_DECIMALS) {
            return Ok(self.length());
        }
        let degs = self.checked_angular_offset(pt)?;
        Ok(degs.abs().to_radians() * self.radius)
    }

    /// Crossings with another arc. Two arcs on the same circle can overlap, touch at an end, or
    /// miss each other entirely.
    pub fn intersect_arc(&self, other: &Arc) -> Vec<Crossing> {
        match self.circle().intersection(&other.circle()) {
            CircleIntersection::Coincident => self.same_circle_crossings(other),
            CircleIntersection::Points(pts) => {
                // Exactly matching circles with slightly different floats still count as one
                if self.circle().almost_equal_to(&other.circle(), 5) {
                    return self.same_circle_crossings(other);
                }
                pts.into_iter()
                    .filter(|pt| {
                        self.includes_point(*pt, INCLUDES_BUFFER)
                            && other.includes_point(*pt, INCLUDES_BUFFER)
                    })
                    .map(Crossing::Point)
                    .collect()
            }
        }
    }

    pub fn intersect_segment(&self, segment: &LineSegment) -> Vec<Pt3D> {
        segment
            .circle_intersection(&self.circle())
            .into_iter()
            .filter(|pt| self.includes_point(*pt, INCLUDES_BUFFER))
            .collect()
    }

    pub fn find_circle_intersection(&self, circle: &Circle) -> Vec<Crossing> {
        if self.circle().almost_equal_to(circle, 5) {
            return vec![Crossing::Overlap(PathElement::Arc(*self))];
        }
        match self.circle().intersection(circle) {
            CircleIntersection::Coincident => vec![Crossing::Overlap(PathElement::Arc(*self))],
            CircleIntersection::Points(pts) => pts
                .into_iter()
                .filter(|pt| self.includes_point(*pt, INCLUDES_BUFFER))
                .map(Crossing::Point)
                .collect(),
        }
    }

    // The range of polar angles around the center covered by this arc, counter-clockwise.
    fn polar_interval(&self) -> (f64, f64) {
        let start_polar = (self.start - self.center()).heading();
        if self.angular_length >= 0.0 {
            (start_polar, start_polar + self.angular_length)
        } else {
            let lo = normalize_heading(start_polar + self.angular_length);
            (lo, lo - self.angular_length)
        }
    }

    fn point_at_polar(&self, polar: f64) -> Pt3D {
        self.center()
            .project_away(self.radius, polar)
            .with_z(self.start.z())
    }

    fn same_circle_crossings(&self, other: &Arc) -> Vec<Crossing> {
        let (lo1, hi1) = self.polar_interval();
        let (lo2, hi2) = other.polar_interval();
        // Points within 5 decimals of each other are the same point
        let point_slack = (1e-5 / self.radius).to_degrees();

        let mut result: Vec<Crossing> = Vec::new();
        for shift in [-360.0, 0.0, 360.0] {
            let lo = lo1.max(lo2 + shift);
            let hi = hi1.min(hi2 + shift);
            if hi < lo - point_slack {
                continue;
            }
            let crossing = if hi - lo <= point_slack {
                Crossing::Point(self.point_at_polar(lo))
            } else if self.angular_length >= 0.0 {
                let start = self.point_at_polar(lo);
                Crossing::Overlap(PathElement::Arc(Arc::new(
                    start,
                    normalize_heading(lo + 90.0),
                    self.radius,
                    hi - lo,
                )))
            } else {
                let start = self.point_at_polar(hi);
                Crossing::Overlap(PathElement::Arc(Arc::new(
                    start,
                    normalize_heading(hi - 90.0),
                    self.radius,
                    lo - hi,
                )))
            };
            let key = crossing.start_point().rounded_to(5);
            if !result.iter().any(|c| c.start_point().rounded_to(5) == key) {
                result.push(crossing);
            }
        }
        result
    }

    /// Grows the arc by some distance at its end, keeping its turning direction. A negative
    /// distance shrinks it.
    pub fn extended_by(&self, distance: f64) -> Arc {
        Arc::new(
            self.start,
            self.theta,
            self.radius,
            self.angular_length + self.angle_for_distance(distance),
        )
    }

    pub fn extend(&mut self, distance: f64) {
        *self = self.extended_by(distance);
    }

    /// Cuts into smaller arcs defined by (start, end) pairs of points on this arc. Every piece
    /// turns in the same direction as the original.
    pub fn split_into(&self, pairs: &[(Pt3D, Pt3D)]) -> Result<Vec<Arc>> {
        let end = self.end_point();
        let mut result = Vec::new();
        for (pt1, pt2) in pairs {
            let off1 = if pt1.almost_equal_to(self.start, crate::CONTIGUITY_DECIMALS) {
                0.0
            } else {
                self.checked_angular_offset(*pt1)?
            };
            let off2 = if pt2.almost_equal_to(end, crate::CONTIGUITY_DECIMALS) {
                self.angular_length
            } else {
                self.checked_angular_offset(*pt2)?
            };
            result.push(Arc::new(*pt1, self.theta + off1, self.radius, off2 - off1));
        }
        Ok(result)
    }

    pub fn can_be_merged_with(&self, other: &Arc) -> bool {
        (self.radius - other.radius).abs() < EPSILON
            && heading_delta(self.end_heading(), other.start_heading()).abs() < 1e-5
            && self.end_point().almost_equal_to(other.start, 5)
            && self.center().almost_equal_to(other.center(), 5)
    }

    pub fn merge(&self, other: &Arc) -> Arc {
        Arc::new(
            self.start,
            self.theta,
            self.radius,
            self.angular_length + other.angular_length,
        )
    }

    /// Tight arcs can't be driven.
    pub fn is_valid_path_connection(&self) -> bool {
        self.radius >= MIN_CONNECTION_RADIUS
    }

    /// Points roughly every `step` meters along the arc, always including both ends.
    pub fn line_interpolation_points(&self, step: f64) -> Vec<Pt3D> {
        let pieces = if step > 0.0 {
            ((self.length() / step).ceil() as usize).max(1)
        } else {
            1
        };
        (0..=pieces)
            .map(|i| self.point_at_angle(self.angular_length * (i as f64) / (pieces as f64)))
            .collect()
    }
}

impl fmt::Display for Arc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Arc({}, {}, {}, {})",
            self.start, self.theta, self.radius, self.angular_length
        )
    }
}
