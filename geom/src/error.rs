use thiserror::Error;

use crate::Pt3D;

/// The ways geometric operations fail. Callers usually see these wrapped in an `anyhow::Error`;
/// use `downcast_ref` to inspect the kind.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("need at least 2 points, but got {0}")]
    NotEnoughPoints(usize),
    #[error("the centerline isn't simple; it crosses or closes on itself")]
    SelfIntersecting,
    #[error("degenerate geometry: {0}")]
    Degenerate(String),
    #[error("{next} doesn't continue a path ending at {end}")]
    NotContiguous { end: Pt3D, next: Pt3D },
    #[error("offset {offset} is outside of [0, {length}]")]
    OffsetOutOfRange { offset: f64, length: f64 },
    #[error("{0} isn't on the geometry")]
    PointNotOnGeometry(Pt3D),
    #[error("{what}: expected {expected}, but got {actual}")]
    ToleranceMismatch {
        what: String,
        expected: Pt3D,
        actual: Pt3D,
    },
    #[error("a width can't be negative, but got {0}")]
    NegativeWidth(f64),
}
