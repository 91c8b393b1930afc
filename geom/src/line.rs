use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{GeometryError, Pt3D};

/// An infinite line in the plane, `a*x + b*y = c`. The z of the first defining point is kept and
/// stamped onto anything derived from the line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Line {
    a: f64,
    b: f64,
    c: f64,
    z: f64,
}

impl Line {
    pub fn new(pt1: Pt3D, pt2: Pt3D) -> Result<Line> {
        if pt1.x() == pt2.x() && pt1.y() == pt2.y() {
            return Err(GeometryError::Degenerate(format!(
                "a line needs two different points, but got {} twice",
                pt1
            ))
            .into());
        }
        let a = pt2.y() - pt1.y();
        let b = pt1.x() - pt2.x();
        Ok(Line {
            a,
            b,
            c: a * pt1.x() + b * pt1.y(),
            z: pt1.z(),
        })
    }

    /// The line passing through a point and following a heading.
    pub fn from_point_and_heading(pt: Pt3D, heading: f64) -> Line {
        let dir = Pt3D::from_heading(heading);
        let a = dir.y();
        let b = -dir.x();
        Line {
            a,
            b,
            c: a * pt.x() + b * pt.y(),
            z: pt.z(),
        }
    }

    /// Returns None for parallel or coincident lines.
    pub fn intersection(&self, other: &Line) -> Option<Pt3D> {
        let det = self.a * other.b - other.a * self.b;
        let scale = self.a.hypot(self.b) * other.a.hypot(other.b);
        if det.abs() <= 1e-12 * scale {
            return None;
        }
        Some(Pt3D::new(
            (other.b * self.c - self.b * other.c) / det,
            (self.a * other.c - other.a * self.c) / det,
            self.z,
        ))
    }

    /// The line crossing this one at a right angle through some point.
    pub fn perpendicular_line_at(&self, pt: Pt3D) -> Line {
        // (a, b) is the normal of this line, so it's the direction of the perpendicular
        let a = -self.b;
        let b = self.a;
        Line {
            a,
            b,
            c: a * pt.x() + b * pt.y(),
            z: pt.z(),
        }
    }

    pub fn contains_pt(&self, pt: Pt3D) -> bool {
        (self.a * pt.x() + self.b * pt.y() - self.c).abs() / self.a.hypot(self.b) < crate::EPSILON
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Line({}x + {}y = {})", self.a, self.b, self.c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersections() {
        let l1 = Line::new(Pt3D::xy(0.0, 0.0), Pt3D::xy(10.0, 10.0)).unwrap();
        let l2 = Line::new(Pt3D::xy(0.0, 10.0), Pt3D::xy(10.0, 0.0)).unwrap();
        let pt = l1.intersection(&l2).unwrap();
        assert!(pt.almost_equal_to(Pt3D::xy(5.0, 5.0), 7));
        assert_eq!(l1.intersection(&l2), l2.intersection(&l1));

        // Intersections outside of the defining points still count
        let l3 = Line::new(Pt3D::xy(20.0, 0.0), Pt3D::xy(20.0, 1.0)).unwrap();
        assert!(l1
            .intersection(&l3)
            .unwrap()
            .almost_equal_to(Pt3D::xy(20.0, 20.0), 7));
    }

    #[test]
    fn parallel_lines_dont_meet() {
        let l1 = Line::new(Pt3D::xy(0.0, 0.0), Pt3D::xy(10.0, 0.0)).unwrap();
        let l2 = Line::new(Pt3D::xy(0.0, 5.0), Pt3D::xy(-10.0, 5.0)).unwrap();
        assert_eq!(l1.intersection(&l2), None);
        assert_eq!(l1.intersection(&l1), None);
    }

    #[test]
    fn headings_and_perpendiculars() {
        let horizontal = Line::from_point_and_heading(Pt3D::xy(0.0, 3.0), 180.0);
        assert!(horizontal.contains_pt(Pt3D::xy(-50.0, 3.0)));
        let vertical = horizontal.perpendicular_line_at(Pt3D::xy(7.0, 0.0));
        assert!(vertical.contains_pt(Pt3D::xy(7.0, 100.0)));
        assert!(horizontal
            .intersection(&vertical)
            .unwrap()
            .almost_equal_to(Pt3D::xy(7.0, 3.0), 7));
    }

    #[test]
    fn same_point_twice() {
        assert!(Line::new(Pt3D::xy(1.0, 1.0), Pt3D::xy(1.0, 1.0)).is_err());
    }
}
