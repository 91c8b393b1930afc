use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use anyhow::Result;
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::{normalize_heading, GeometryError};

/// A point in world space, measured in meters. The same type doubles as a vector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pt3D {
    x: f64,
    y: f64,
    z: f64,
}

impl Pt3D {
    pub fn new(x: f64, y: f64, z: f64) -> Pt3D {
        if !x.is_finite() || !y.is_finite() || !z.is_finite() {
            panic!("Bad Pt3D {}, {}, {}", x, y, z);
        }
        Pt3D { x, y, z }
    }

    /// A point at zero elevation.
    pub fn xy(x: f64, y: f64) -> Pt3D {
        Pt3D::new(x, y, 0.0)
    }

    pub fn zero() -> Pt3D {
        Pt3D::xy(0.0, 0.0)
    }

    /// The unit vector pointing along a heading.
    pub fn from_heading(degs: f64) -> Pt3D {
        let (sin, cos) = degs.to_radians().sin_cos();
        Pt3D::xy(cos, sin)
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }

    pub fn z(self) -> f64 {
        self.z
    }

    pub fn dot(self, other: Pt3D) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Pt3D) -> Pt3D {
        Pt3D::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Only the z component of the cross product, treating both vectors as flat.
    pub fn cross_2d(self, other: Pt3D) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn norm_squared(self) -> f64 {
        self.dot(self)
    }

    pub fn norm(self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn dist_to(self, other: Pt3D) -> f64 {
        (other - self).norm()
    }

    pub fn squared_dist_to(self, other: Pt3D) -> f64 {
        (other - self).norm_squared()
    }

    pub fn normalized(self) -> Result<Pt3D> {
        let norm = self.norm();
        if norm == 0.0 {
            return Err(GeometryError::Degenerate("can't normalize a null vector".to_string()).into());
        }
        Ok(self * (1.0 / norm))
    }

    /// The signed angle in degrees needed to rotate this vector onto the other one, measured
    /// around +z. The result is in (-180, 180].
    pub fn angle_to(self, other: Pt3D) -> f64 {
        self.cross_2d(other)
            .atan2(self.x * other.x + self.y * other.y)
            .to_degrees()
    }

    /// Interpreting this as a vector, the direction it points to.
    pub fn heading(self) -> f64 {
        normalize_heading(self.y.atan2(self.x).to_degrees())
    }

    pub fn heading_to(self, other: Pt3D) -> f64 {
        (other - self).heading()
    }

    pub fn project_away(self, dist: f64, heading: f64) -> Pt3D {
        self + Pt3D::from_heading(heading) * dist
    }

    pub fn offset(self, dx: f64, dy: f64) -> Pt3D {
        Pt3D::new(self.x + dx, self.y + dy, self.z)
    }

    pub fn with_z(self, z: f64) -> Pt3D {
        Pt3D::new(self.x, self.y, z)
    }

    /// Rotates around +z by some degrees, counter-clockwise.
    pub fn rotate(self, degs: f64) -> Pt3D {
        let (sin, cos) = degs.to_radians().sin_cos();
        Pt3D::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
            self.z,
        )
    }

    pub fn midpoint(self, other: Pt3D) -> Pt3D {
        (self + other) * 0.5
    }

    pub fn min(self, other: Pt3D) -> Pt3D {
        Pt3D::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    pub fn max(self, other: Pt3D) -> Pt3D {
        Pt3D::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }

    /// Rounds every component to some decimal places, producing something usable as a key.
    pub fn rounded_to(self, decimals: i32) -> HashablePt3D {
        let factor = 10_f64.powi(decimals);
        let round = |x: f64| {
            let result = (x * factor).round() / factor;
            // Don't let -0.0 and 0.0 turn into different keys
            if result == 0.0 {
                0.0
            } else {
                result
            }
        };
        HashablePt3D::new(round(self.x), round(self.y), round(self.z))
    }

    /// True if every component differs by less than 10^-decimals.
    pub fn almost_equal_to(self, other: Pt3D, decimals: i32) -> bool {
        let tolerance = 10_f64.powi(-decimals);
        (self.x - other.x).abs() < tolerance
            && (self.y - other.y).abs() < tolerance
            && (self.z - other.z).abs() < tolerance
    }
}

impl fmt::Display for Pt3D {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pt3D({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Add for Pt3D {
    type Output = Pt3D;

    fn add(self, other: Pt3D) -> Pt3D {
        Pt3D::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Pt3D {
    type Output = Pt3D;

    fn sub(self, other: Pt3D) -> Pt3D {
        Pt3D::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Pt3D {
    type Output = Pt3D;

    fn mul(self, factor: f64) -> Pt3D {
        Pt3D::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl Neg for Pt3D {
    type Output = Pt3D;

    fn neg(self) -> Pt3D {
        Pt3D::new(-self.x, -self.y, -self.z)
    }
}

// This isn't opinionated about what the (x, y, z) represents. Usually it's a rounded Pt3D.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HashablePt3D {
    x_nan: NotNan<f64>,
    y_nan: NotNan<f64>,
    z_nan: NotNan<f64>,
}

impl HashablePt3D {
    fn new(x: f64, y: f64, z: f64) -> HashablePt3D {
        // Pt3D::new already rejects NaN
        HashablePt3D {
            x_nan: NotNan::new(x).unwrap(),
            y_nan: NotNan::new(y).unwrap(),
            z_nan: NotNan::new(z).unwrap(),
        }
    }

    pub fn to_pt3d(self) -> Pt3D {
        Pt3D::new(
            self.x_nan.into_inner(),
            self.y_nan.into_inner(),
            self.z_nan.into_inner(),
        )
    }
}
