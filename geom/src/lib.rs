//! Geometric primitives used to describe lanes: points, infinite lines, line segments, circles,
//! arcs and the paths composed out of them.
//!
//! Everything lives in world space, measured in meters. Elevation is a flat z offset that's
//! carried around but never used for any calculation. Angles are in degrees, counter-clockwise
//! from +x, and headings are always normalized to [0, 360).

mod angle;
mod arc;
mod bounds;
mod circle;
mod error;
mod line;
mod line_segment;
mod path;
mod path_element;
mod pt;

pub use crate::angle::{heading_delta, normalize_heading};
pub use crate::arc::Arc;
pub use crate::bounds::BoundingBox;
pub use crate::circle::{Circle, CircleIntersection};
pub use crate::error::GeometryError;
pub use crate::line::Line;
pub use crate::line_segment::LineSegment;
pub use crate::path::Path;
pub use crate::path_element::{Crossing, PathElement};
pub use crate::pt::{HashablePt3D, Pt3D};

/// Consecutive path elements must share their endpoints up to this many decimals.
pub const CONTIGUITY_DECIMALS: i32 = 7;

/// Generic tolerance for comparing lengths and offsets.
pub const EPSILON: f64 = 1e-7;

/// How far off a primitive a point may be and still count as being on it.
pub const INCLUDES_BUFFER: f64 = 1e-5;

/// Arcs tighter than this can't be driven, so they're rejected as connections between lanes.
pub const MIN_CONNECTION_RADIUS: f64 = 4.1;
