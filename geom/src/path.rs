use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    Circle, Crossing, GeometryError, LineSegment, PathElement, Pt3D, CONTIGUITY_DECIMALS,
    EPSILON, INCLUDES_BUFFER,
};

/// A chain of segments and arcs, where every element starts exactly where the previous one ends.
/// The only ways to change a path are `add_element`, `simplify` and `split_in`, and all of them
/// preserve that.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    pub fn new() -> Path {
        Path::default()
    }

    pub fn from_elements(elements: Vec<PathElement>) -> Result<Path> {
        let mut path = Path::new();
        for element in elements {
            path.add_element(element)?;
        }
        Ok(path)
    }

    /// Straight segments between consecutive points.
    pub fn polyline_from_points(pts: &[Pt3D]) -> Result<Path> {
        if pts.len() < 2 {
            return Err(GeometryError::NotEnoughPoints(pts.len()).into());
        }
        Path::from_elements(
            pts.windows(2)
                .map(|pair| PathElement::Segment(LineSegment::new(pair[0], pair[1])))
                .collect(),
        )
    }

    pub fn add_element(&mut self, element: PathElement) -> Result<()> {
        if let Some(last) = self.elements.last() {
            let end = last.end_point();
            let next = element.start_point();
            if !end.almost_equal_to(next, CONTIGUITY_DECIMALS) {
                return Err(GeometryError::NotContiguous { end, next }.into());
            }
        }
        self.elements.push(element);
        Ok(())
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn start_point(&self) -> Option<Pt3D> {
        self.elements.first().map(|e| e.start_point())
    }

    pub fn end_point(&self) -> Option<Pt3D> {
        self.elements.last().map(|e| e.end_point())
    }

    pub fn length(&self) -> f64 {
        self.elements.iter().map(|e| e.length()).sum()
    }

    /// Where every element starts, plus where the last one ends.
    pub fn vertices(&self) -> Vec<Pt3D> {
        let mut pts: Vec<Pt3D> = self.elements.iter().map(|e| e.start_point()).collect();
        if let Some(pt) = self.end_point() {
            pts.push(pt);
        }
        pts
    }

    pub fn starts_on(&self, pt: Pt3D) -> bool {
        self.start_point()
            .map(|start| start.almost_equal_to(pt, 5))
            .unwrap_or(false)
    }

    pub fn ends_on(&self, pt: Pt3D) -> bool {
        self.end_point()
            .map(|end| end.almost_equal_to(pt, 5))
            .unwrap_or(false)
    }

    pub fn is_self_closing(&self) -> bool {
        match (self.start_point(), self.end_point()) {
            (Some(start), Some(end)) => self.elements.len() > 1 && start.almost_equal_to(end, 5),
            _ => false,
        }
    }

    pub fn includes_point(&self, pt: Pt3D, buffer: f64) -> bool {
        self.elements.iter().any(|e| e.includes_point(pt, buffer))
    }

    pub fn offset_for_point(&self, pt: Pt3D) -> Result<f64> {
        self.offset_for_point_from(pt, 0.0)
    }

    /// Like `offset_for_point`, but ignores any match before `start_offset`. Closed paths visit
    /// their starting point twice, so this picks which visit is meant.
    pub fn offset_for_point_from(&self, pt: Pt3D, start_offset: f64) -> Result<f64> {
        let mut accumulated = 0.0;
        for element in &self.elements {
            if element.includes_point(pt, INCLUDES_BUFFER) {
                let offset = accumulated + element.offset_for_point(pt)?;
                if offset >= start_offset - EPSILON {
                    return Ok(offset);
                }
                // A full-circle arc only reports its start; try its end too
                if element.end_point().almost_equal_to(pt, CONTIGUITY_DECIMALS)
                    && accumulated + element.length() >= start_offset - EPSILON
                {
                    return Ok(accumulated + element.length());
                }
            }
            accumulated += element.length();
        }
        Err(GeometryError::PointNotOnGeometry(pt).into())
    }

    // The element covering some offset, along with the offset relative to that element.
    fn element_at_offset(&self, offset: f64) -> Result<(&PathElement, f64)> {
        let length = self.length();
        if self.elements.is_empty() || offset < -EPSILON || offset > length + EPSILON {
            return Err(GeometryError::OffsetOutOfRange { offset, length }.into());
        }
        let mut accumulated = 0.0;
        for element in &self.elements {
            let element_length = element.length();
            if offset <= accumulated + element_length {
                return Ok((element, (offset - accumulated).clamp(0.0, element_length)));
            }
            accumulated += element_length;
        }
        // Only reachable through floating point drift past the end
        let last = &self.elements[self.elements.len() - 1];
        Ok((last, last.length()))
    }

    pub fn point_at_offset(&self, offset: f64) -> Result<Pt3D> {
        let (element, offset) = self.element_at_offset(offset)?;
        element.point_at_offset(offset)
    }

    pub fn heading_at_offset(&self, offset: f64) -> Result<f64> {
        let (element, offset) = self.element_at_offset(offset)?;
        element.heading_at_offset(offset)
    }

    pub fn heading_at_point(&self, pt: Pt3D) -> Result<f64> {
        self.heading_at_offset(self.offset_for_point(pt)?)
    }

    /// Every crossing of a circle with any element. A crossing at the boundary between two
    /// elements shows up twice.
    pub fn find_circle_intersection(&self, circle: &Circle) -> Vec<Crossing> {
        self.elements
            .iter()
            .flat_map(|e| e.find_circle_intersection(circle))
            .collect()
    }

    /// Merges consecutive elements that continue each other, in one pass from the start.
    pub fn simplify(&mut self) {
        let mut simplified: Vec<PathElement> = Vec::new();
        for element in self.elements.drain(..) {
            if let Some(last) = simplified.last_mut() {
                if last.can_be_merged_with(&element) {
                    *last = last.merge(&element);
                    continue;
                }
            }
            simplified.push(element);
        }
        self.elements = simplified;
    }

    /// Recuts the path so that the given points, ordered along the path, become exactly the
    /// boundaries between elements. The first and last point must be the ends of the path, and
    /// every current element boundary must be one of the points.
    pub fn split_in(&mut self, pts: &[Pt3D]) -> Result<()> {
        if pts.len() < 2 {
            return Err(GeometryError::NotEnoughPoints(pts.len()).into());
        }

        let mut new_elements = Vec::new();
        let mut idx = 0;
        for element in &self.elements {
            if !pts[idx].almost_equal_to(element.start_point(), CONTIGUITY_DECIMALS) {
                return Err(GeometryError::PointNotOnGeometry(pts[idx]).into());
            }
            let end = element.end_point();
            let mut pairs = Vec::new();
            loop {
                let next = match pts.get(idx + 1) {
                    Some(pt) => *pt,
                    None => return Err(GeometryError::PointNotOnGeometry(end).into()),
                };
                if !element.includes_point(next, INCLUDES_BUFFER) {
                    return Err(GeometryError::PointNotOnGeometry(next).into());
                }
                pairs.push((pts[idx], next));
                idx += 1;
                if next.almost_equal_to(end, CONTIGUITY_DECIMALS) {
                    break;
                }
            }
            new_elements.extend(element.split_into(&pairs)?);
        }
        if idx != pts.len() - 1 {
            return Err(GeometryError::PointNotOnGeometry(pts[idx + 1]).into());
        }

        *self = Path::from_elements(new_elements)?;
        Ok(())
    }

    pub fn is_valid_path_connection(&self) -> bool {
        self.elements.iter().all(|e| e.is_valid_path_connection())
    }

    /// Points roughly every `step` meters, including every element boundary once.
    pub fn line_interpolation_points(&self, step: f64) -> Vec<Pt3D> {
        let mut pts: Vec<Pt3D> = Vec::new();
        for element in &self.elements {
            let mut element_pts = element.line_interpolation_points(step);
            if !pts.is_empty() {
                element_pts.remove(0);
            }
            pts.extend(element_pts);
        }
        pts
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Path with {} elements:", self.elements.len())?;
        for element in &self.elements {
            writeln!(f, "  {}", element)?;
        }
        Ok(())
    }
}
