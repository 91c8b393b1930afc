use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{heading_delta, Circle, GeometryError, Line, Pt3D, CONTIGUITY_DECIMALS, EPSILON};

/// A straight piece of geometry, directed from start to end.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    start: Pt3D,
    end: Pt3D,
}

impl LineSegment {
    pub fn new(start: Pt3D, end: Pt3D) -> LineSegment {
        LineSegment { start, end }
    }

    pub fn from_point_and_heading(start: Pt3D, heading: f64, length: f64) -> LineSegment {
        LineSegment::new(start, start.project_away(length, heading))
    }

    pub fn start_point(&self) -> Pt3D {
        self.start
    }

    pub fn end_point(&self) -> Pt3D {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.start.dist_to(self.end)
    }

    pub fn direction(&self) -> Result<Pt3D> {
        (self.end - self.start).normalized()
    }

    /// The heading is constant along a segment. A zero-length segment points east.
    pub fn heading(&self) -> f64 {
        self.start.heading_to(self.end)
    }

    pub fn to_line(&self) -> Result<Line> {
        Line::new(self.start, self.end)
    }

    pub fn inverted(&self) -> LineSegment {
        LineSegment::new(self.end, self.start)
    }

    pub fn point_at_offset(&self, offset: f64) -> Result<Pt3D> {
        let length = self.length();
        if offset < -EPSILON || offset > length + EPSILON {
            return Err(GeometryError::OffsetOutOfRange { offset, length }.into());
        }
        if length == 0.0 {
            return Ok(self.start);
        }
        Ok(self.start + (self.end - self.start) * (offset / length))
    }

    pub fn offset_for_point(&self, pt: Pt3D) -> Result<f64> {
        if !self.includes_point(pt, crate::INCLUDES_BUFFER) {
            return Err(GeometryError::PointNotOnGeometry(pt).into());
        }
        Ok(self.start.dist_to(pt).min(self.length()))
    }

    /// First checks the point is close enough to the infinite line (the cross product against the
    /// unit direction is the distance), then that it falls between the two ends.
    pub fn includes_point(&self, pt: Pt3D, buffer: f64) -> bool {
        let length = self.length();
        if length < EPSILON {
            return self.start.dist_to(pt) <= buffer;
        }
        let dir = (self.end - self.start) * (1.0 / length);
        let v = pt - self.start;
        if dir.cross_2d(v).abs() > buffer {
            return false;
        }
        let projected = v.dot(self.end - self.start);
        projected >= -buffer * length && projected <= length * length + buffer * length
    }

    /// The single crossing point of two segments. Collinear or parallel segments don't count.
    pub fn find_intersection(&self, other: &LineSegment) -> Option<Pt3D> {
        let r = self.end - self.start;
        let s = other.end - other.start;
        let denom = r.cross_2d(s);
        if denom.abs() <= 1e-12 * r.norm() * s.norm() {
            return None;
        }
        let q = other.start - self.start;
        let t = q.cross_2d(s) / denom;
        let u = q.cross_2d(r) / denom;
        let slack = 1e-9;
        if t < -slack || t > 1.0 + slack || u < -slack || u > 1.0 + slack {
            return None;
        }
        Some(self.start + r * t.clamp(0.0, 1.0))
    }

    /// Where a circle crosses this segment, ordered from the start. A tangent circle touches once.
    pub fn circle_intersection(&self, circle: &Circle) -> Vec<Pt3D> {
        let d = self.end - self.start;
        let f = self.start - circle.center;
        let a = d.x() * d.x() + d.y() * d.y();
        if a == 0.0 {
            return Vec::new();
        }
        let b = 2.0 * (f.x() * d.x() + f.y() * d.y());
        let c = f.x() * f.x() + f.y() * f.y() - circle.radius * circle.radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < -1e-9 * a {
            return Vec::new();
        }

        let slack = 1e-9;
        let mut ts = Vec::new();
        if discriminant <= 1e-9 * a {
            ts.push(-b / (2.0 * a));
        } else {
            let root = discriminant.sqrt();
            ts.push((-b - root) / (2.0 * a));
            ts.push((-b + root) / (2.0 * a));
        }
        ts.into_iter()
            .filter(|t| *t >= -slack && *t <= 1.0 + slack)
            .map(|t| self.start + d * t.clamp(0.0, 1.0))
            .collect()
    }

    pub fn closest_point_to(&self, pt: Pt3D) -> Pt3D {
        let d = self.end - self.start;
        let len_squared = d.norm_squared();
        if len_squared == 0.0 {
            return self.start;
        }
        let t = ((pt - self.start).dot(d) / len_squared).clamp(0.0, 1.0);
        self.start + d * t
    }

    /// Moves the end along the segment's direction. A negative distance shortens it.
    pub fn extended_by(&self, distance: f64) -> LineSegment {
        LineSegment::new(self.start, self.end.project_away(distance, self.heading()))
    }

    pub fn extend(&mut self, distance: f64) {
        *self = self.extended_by(distance);
    }

    pub fn is_orthogonal_to(&self, other: &LineSegment) -> bool {
        match (self.direction(), other.direction()) {
            (Ok(d1), Ok(d2)) => (d1.x() * d2.x() + d1.y() * d2.y()).abs() < EPSILON,
            _ => false,
        }
    }

    pub fn can_be_merged_with(&self, other: &LineSegment) -> bool {
        self.end.almost_equal_to(other.start, CONTIGUITY_DECIMALS)
            && heading_delta(self.heading(), other.heading()).abs() < 1e-5
    }

    pub fn merge(&self, other: &LineSegment) -> LineSegment {
        LineSegment::new(self.start, other.end)
    }

    /// Cuts this segment into pieces defined by (start, end) pairs of points on it.
    pub fn split_into(&self, pairs: &[(Pt3D, Pt3D)]) -> Result<Vec<LineSegment>> {
        let mut result = Vec::new();
        for (start, end) in pairs {
            for pt in [start, end] {
                if !self.includes_point(*pt, crate::INCLUDES_BUFFER) {
                    return Err(GeometryError::PointNotOnGeometry(*pt).into());
                }
            }
            result.push(LineSegment::new(*start, *end));
        }
        Ok(result)
    }

    /// Points every `step` meters, always including both ends.
    pub fn line_interpolation_points(&self, step: f64) -> Vec<Pt3D> {
        let length = self.length();
        let mut pts = vec![self.start];
        if step > 0.0 {
            let mut dist = step;
            while dist < length - EPSILON {
                pts.push(self.start + (self.end - self.start) * (dist / length));
                dist += step;
            }
        }
        pts.push(self.end);
        pts
    }
}

impl fmt::Display for LineSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "LineSegment({}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x1: f64, y1: f64, x2: f64, y2: f64) -> LineSegment {
        LineSegment::new(Pt3D::xy(x1, y1), Pt3D::xy(x2, y2))
    }

    #[test]
    fn includes_points() {
        let s = seg(0.0, 0.0, 10.0, 10.0);
        assert!(s.includes_point(Pt3D::xy(5.0, 5.0), 1e-7));
        assert!(s.includes_point(Pt3D::xy(0.0, 0.0), 1e-7));
        assert!(s.includes_point(Pt3D::xy(10.0, 10.0), 1e-7));
        assert!(!s.includes_point(Pt3D::xy(11.0, 11.0), 1e-7));
        assert!(!s.includes_point(Pt3D::xy(-1.0, -1.0), 1e-7));
        assert!(!s.includes_point(Pt3D::xy(5.0, 5.1), 1e-7));
        assert!(s.includes_point(Pt3D::xy(5.0, 5.1), 0.1));
    }

    #[test]
    fn offsets() {
        let s = seg(0.0, 0.0, 0.0, -20.0);
        assert!(s
            .point_at_offset(5.0)
            .unwrap()
            .almost_equal_to(Pt3D::xy(0.0, -5.0), 7));
        assert!((s.offset_for_point(Pt3D::xy(0.0, -12.5)).unwrap() - 12.5).abs() < 1e-9);
        assert!(s.point_at_offset(20.5).is_err());
        assert!(s.offset_for_point(Pt3D::xy(1.0, -12.5)).is_err());
        assert!((s.heading() - 270.0).abs() < 1e-9);
    }

    #[test]
    fn segment_intersections() {
        let s1 = seg(0.0, 0.0, 10.0, 10.0);
        let s2 = seg(0.0, 10.0, 10.0, 0.0);
        assert!(s1
            .find_intersection(&s2)
            .unwrap()
            .almost_equal_to(Pt3D::xy(5.0, 5.0), 7));

        // Touching at an endpoint counts
        let s3 = seg(10.0, 10.0, 20.0, 0.0);
        assert!(s1
            .find_intersection(&s3)
            .unwrap()
            .almost_equal_to(Pt3D::xy(10.0, 10.0), 7));

        // The infinite lines cross, but not the segments
        assert_eq!(s1.find_intersection(&seg(20.0, 0.0, 30.0, -10.0)), None);
        // Collinear
        assert_eq!(s1.find_intersection(&seg(5.0, 5.0, 20.0, 20.0)), None);
    }

    #[test]
    fn circle_intersections() {
        let circle = Circle::new(Pt3D::zero(), 5.0);
        let through = seg(-10.0, 0.0, 10.0, 0.0).circle_intersection(&circle);
        assert_eq!(through.len(), 2);
        assert!(through[0].almost_equal_to(Pt3D::xy(-5.0, 0.0), 7));
        assert!(through[1].almost_equal_to(Pt3D::xy(5.0, 0.0), 7));

        let half = seg(0.0, 0.0, 0.0, 10.0).circle_intersection(&circle);
        assert_eq!(half.len(), 1);
        assert!(half[0].almost_equal_to(Pt3D::xy(0.0, 5.0), 7));

        let tangent = seg(-10.0, 5.0, 10.0, 5.0).circle_intersection(&circle);
        assert_eq!(tangent.len(), 1);
        assert!(tangent[0].almost_equal_to(Pt3D::xy(0.0, 5.0), 7));

        assert!(seg(-10.0, 6.0, 10.0, 6.0)
            .circle_intersection(&circle)
            .is_empty());
    }

    #[test]
    fn extending() {
        let s = seg(0.0, 0.0, 3.0, 4.0);
        assert!(s
            .extended_by(5.0)
            .end_point()
            .almost_equal_to(Pt3D::xy(6.0, 8.0), 7));
        assert!(s
            .extended_by(-2.5)
            .end_point()
            .almost_equal_to(Pt3D::xy(1.5, 2.0), 7));
        let mut s2 = s;
        s2.extend(0.0);
        assert_eq!(s, s2);
    }

    #[test]
    fn orthogonality_and_merging() {
        let s1 = seg(0.0, 0.0, 10.0, 0.0);
        assert!(s1.is_orthogonal_to(&seg(3.0, 3.0, 3.0, -7.0)));
        assert!(!s1.is_orthogonal_to(&seg(0.0, 0.0, 1.0, 1.0)));

        let s2 = seg(10.0, 0.0, 25.0, 0.0);
        assert!(s1.can_be_merged_with(&s2));
        assert_eq!(s1.merge(&s2), seg(0.0, 0.0, 25.0, 0.0));
        assert!(!s1.can_be_merged_with(&seg(10.0, 0.0, 20.0, 1.0)));
        assert!(!s1.can_be_merged_with(&seg(11.0, 0.0, 20.0, 0.0)));
    }

    #[test]
    fn splitting() {
        let s = seg(0.0, 0.0, 10.0, 0.0);
        let pieces = s
            .split_into(&[
                (Pt3D::xy(0.0, 0.0), Pt3D::xy(4.0, 0.0)),
                (Pt3D::xy(4.0, 0.0), Pt3D::xy(10.0, 0.0)),
            ])
            .unwrap();
        assert_eq!(pieces, vec![seg(0.0, 0.0, 4.0, 0.0), seg(4.0, 0.0, 10.0, 0.0)]);
        assert!(s
            .split_into(&[(Pt3D::xy(0.0, 0.0), Pt3D::xy(4.0, 1.0))])
            .is_err());
    }

    #[test]
    fn interpolation() {
        let pts = seg(0.0, 0.0, 10.0, 0.0).line_interpolation_points(4.0);
        assert_eq!(pts.len(), 4);
        for (pt, x) in pts.into_iter().zip([0.0, 4.0, 8.0, 10.0]) {
            assert!(pt.almost_equal_to(Pt3D::xy(x, 0.0), 9));
        }
    }
}
