use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{Arc, Circle, LineSegment, Pt3D};

/// The pieces that paths are made of.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PathElement {
    Segment(LineSegment),
    Arc(Arc),
}

/// The result of intersecting two pieces of geometry: they either cross at a point, or share a
/// whole stretch.
#[derive(Clone, Debug, PartialEq)]
pub enum Crossing {
    Point(Pt3D),
    Overlap(PathElement),
}

impl Crossing {
    pub fn start_point(&self) -> Pt3D {
        match self {
            Crossing::Point(pt) => *pt,
            Crossing::Overlap(element) => element.start_point(),
        }
    }

    /// Reduces an overlap to the single point on it that's closest to something.
    pub fn closest_point_to(&self, pt: Pt3D) -> Pt3D {
        match self {
            Crossing::Point(x) => *x,
            Crossing::Overlap(PathElement::Segment(seg)) => seg.closest_point_to(pt),
            Crossing::Overlap(PathElement::Arc(arc)) => {
                let center = arc.center();
                if let Ok(dir) = (pt - center).normalized() {
                    let candidate = center + dir * arc.radius();
                    if arc.includes_point(candidate, crate::INCLUDES_BUFFER) {
                        return candidate;
                    }
                }
                let (start, end) = (arc.start_point(), arc.end_point());
                if start.dist_to(pt) <= end.dist_to(pt) {
                    start
                } else {
                    end
                }
            }
        }
    }
}

impl PathElement {
    pub fn start_point(&self) -> Pt3D {
        match self {
            PathElement::Segment(x) => x.start_point(),
            PathElement::Arc(x) => x.start_point(),
        }
    }

    pub fn end_point(&self) -> Pt3D {
        match self {
            PathElement::Segment(x) => x.end_point(),
            PathElement::Arc(x) => x.end_point(),
        }
    }

    pub fn start_heading(&self) -> f64 {
        match self {
            PathElement::Segment(x) => x.heading(),
            PathElement::Arc(x) => x.start_heading(),
        }
    }

    pub fn end_heading(&self) -> f64 {
        match self {
            PathElement::Segment(x) => x.heading(),
            PathElement::Arc(x) => x.end_heading(),
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            PathElement::Segment(x) => x.length(),
            PathElement::Arc(x) => x.length(),
        }
    }

    pub fn point_at_offset(&self, offset: f64) -> Result<Pt3D> {
        match self {
            PathElement::Segment(x) => x.point_at_offset(offset),
            PathElement::Arc(x) => x.point_at_offset(offset),
        }
    }

    pub fn heading_at_offset(&self, offset: f64) -> Result<f64> {
        match self {
            PathElement::Segment(x) => {
                // Just for the range check
                x.point_at_offset(offset)?;
                Ok(x.heading())
            }
            PathElement::Arc(x) => x.heading_at_offset(offset),
        }
    }

    pub fn offset_for_point(&self, pt: Pt3D) -> Result<f64> {
        match self {
            PathElement::Segment(x) => x.offset_for_point(pt),
            PathElement::Arc(x) => x.offset_for_point(pt),
        }
    }

    pub fn includes_point(&self, pt: Pt3D, buffer: f64) -> bool {
        match self {
            PathElement::Segment(x) => x.includes_point(pt, buffer),
            PathElement::Arc(x) => x.includes_point(pt, buffer),
        }
    }

    pub fn find_intersection(&self, other: &PathElement) -> Vec<Crossing> {
        match (self, other) {
            (PathElement::Segment(s1), PathElement::Segment(s2)) => s1
                .find_intersection(s2)
                .into_iter()
                .map(Crossing::Point)
                .collect(),
            (PathElement::Segment(s), PathElement::Arc(a))
            | (PathElement::Arc(a), PathElement::Segment(s)) => a
                .intersect_segment(s)
                .into_iter()
                .map(Crossing::Point)
                .collect(),
            (PathElement::Arc(a1), PathElement::Arc(a2)) => a1.intersect_arc(a2),
        }
    }

    pub fn find_circle_intersection(&self, circle: &Circle) -> Vec<Crossing> {
        match self {
            PathElement::Segment(x) => x
                .circle_intersection(circle)
                .into_iter()
                .map(Crossing::Point)
                .collect(),
            PathElement::Arc(x) => x.find_circle_intersection(circle),
        }
    }

    pub fn extended_by(&self, distance: f64) -> PathElement {
        match self {
            PathElement::Segment(x) => PathElement::Segment(x.extended_by(distance)),
            PathElement::Arc(x) => PathElement::Arc(x.extended_by(distance)),
        }
    }

    pub fn can_be_merged_with(&self, other: &PathElement) -> bool {
        match (self, other) {
            (PathElement::Segment(s1), PathElement::Segment(s2)) => s1.can_be_merged_with(s2),
            (PathElement::Arc(a1), PathElement::Arc(a2)) => a1.can_be_merged_with(a2),
            _ => false,
        }
    }

    /// Only call after `can_be_merged_with` says yes.
    pub fn merge(&self, other: &PathElement) -> PathElement {
        match (self, other) {
            (PathElement::Segment(s1), PathElement::Segment(s2)) => {
                PathElement::Segment(s1.merge(s2))
            }
            (PathElement::Arc(a1), PathElement::Arc(a2)) => PathElement::Arc(a1.merge(a2)),
            _ => panic!("can't merge {} with {}", self, other),
        }
    }

    pub fn split_into(&self, pairs: &[(Pt3D, Pt3D)]) -> Result<Vec<PathElement>> {
        Ok(match self {
            PathElement::Segment(x) => x
                .split_into(pairs)?
                .into_iter()
                .map(PathElement::Segment)
                .collect(),
            PathElement::Arc(x) => x
                .split_into(pairs)?
                .into_iter()
                .map(PathElement::Arc)
                .collect(),
        })
    }

    pub fn is_valid_path_connection(&self) -> bool {
        match self {
            PathElement::Segment(_) => true,
            PathElement::Arc(x) => x.is_valid_path_connection(),
        }
    }

    pub fn line_interpolation_points(&self, step: f64) -> Vec<Pt3D> {
        match self {
            PathElement::Segment(x) => x.line_interpolation_points(step),
            PathElement::Arc(x) => x.line_interpolation_points(step),
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathElement::Segment(x) => write!(f, "{}", x),
            PathElement::Arc(x) => write!(f, "{}", x),
        }
    }
}

impl From<LineSegment> for PathElement {
    fn from(x: LineSegment) -> PathElement {
        PathElement::Segment(x)
    }
}

impl From<Arc> for PathElement {
    fn from(x: Arc) -> PathElement {
        PathElement::Arc(x)
    }
}
