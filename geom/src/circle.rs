use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, Pt3D, EPSILON};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Pt3D,
    pub radius: f64,
}

/// How two circles meet.
#[derive(Clone, Debug, PartialEq)]
pub enum CircleIntersection {
    /// Both circles are the same one.
    Coincident,
    /// Zero, one (tangent) or two points.
    Points(Vec<Pt3D>),
}

impl Circle {
    pub fn new(center: Pt3D, radius: f64) -> Circle {
        Circle { center, radius }
    }

    pub fn contains_pt(&self, pt: Pt3D) -> bool {
        // avoid sqrt by squaring radius instead
        self.center.squared_dist_to(pt) < self.radius.powi(2)
    }

    pub fn point_at_heading(&self, heading: f64) -> Pt3D {
        self.center.project_away(self.radius, heading)
    }

    pub fn almost_equal_to(&self, other: &Circle, decimals: i32) -> bool {
        self.center.almost_equal_to(other.center, decimals)
            && (self.radius - other.radius).abs() < 10_f64.powi(-decimals)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let r = Pt3D::xy(self.radius, self.radius);
        BoundingBox::new(self.center - r, self.center + r)
    }

    /// The points where two circles meet. The result doesn't depend on the order of the circles,
    /// besides the order of the points.
    pub fn intersection(&self, other: &Circle) -> CircleIntersection {
        let delta = other.center - self.center;
        let d = delta.x().hypot(delta.y());
        if d < EPSILON {
            if (self.radius - other.radius).abs() < EPSILON {
                return CircleIntersection::Coincident;
            }
            // Concentric, so one is inside the other
            return CircleIntersection::Points(Vec::new());
        }
        if d > self.radius + other.radius + EPSILON
            || d < (self.radius - other.radius).abs() - EPSILON
        {
            return CircleIntersection::Points(Vec::new());
        }

        // Distance from our center to the chord connecting the two points, and half the chord
        let a = (self.radius.powi(2) - other.radius.powi(2) + d * d) / (2.0 * d);
        let h_squared = self.radius.powi(2) - a * a;
        let chord_mid = self.center + delta * (a / d);
        if h_squared <= EPSILON * self.radius.max(other.radius) {
            return CircleIntersection::Points(vec![chord_mid]);
        }
        let h = h_squared.sqrt();
        let perp = Pt3D::new(-delta.y() * h / d, delta.x() * h / d, 0.0);
        CircleIntersection::Points(vec![chord_mid + perp, chord_mid - perp])
    }
}

impl fmt::Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Circle({}, {})", self.center, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    use super::*;

    fn points(result: CircleIntersection) -> Vec<Pt3D> {
        match result {
            CircleIntersection::Points(pts) => pts,
            CircleIntersection::Coincident => panic!("unexpected coincident circles"),
        }
    }

    fn same_points(mut pts1: Vec<Pt3D>, mut pts2: Vec<Pt3D>) -> bool {
        if pts1.len() != pts2.len() {
            return false;
        }
        let key = |pt: &Pt3D| pt.rounded_to(5);
        pts1.sort_by_key(key);
        pts2.sort_by_key(key);
        pts1.into_iter()
            .zip(pts2)
            .all(|(p1, p2)| p1.almost_equal_to(p2, 5))
    }

    #[test]
    fn two_points() {
        let c1 = Circle::new(Pt3D::zero(), 5.0);
        let c2 = Circle::new(Pt3D::xy(0.0, 8.0), 5.0);
        assert!(same_points(
            points(c1.intersection(&c2)),
            vec![Pt3D::xy(3.0, 4.0), Pt3D::xy(-3.0, 4.0)]
        ));
    }

    #[test]
    fn tangent_circles() {
        let c1 = Circle::new(Pt3D::zero(), 5.0);
        let outside = Circle::new(Pt3D::xy(10.0, 0.0), 5.0);
        assert!(same_points(
            points(c1.intersection(&outside)),
            vec![Pt3D::xy(5.0, 0.0)]
        ));
        let inside = Circle::new(Pt3D::xy(0.0, 2.0), 3.0);
        assert!(same_points(
            points(c1.intersection(&inside)),
            vec![Pt3D::xy(0.0, 5.0)]
        ));
    }

    #[test]
    fn no_points() {
        let c1 = Circle::new(Pt3D::zero(), 5.0);
        assert!(points(c1.intersection(&Circle::new(Pt3D::xy(20.0, 0.0), 5.0))).is_empty());
        assert!(points(c1.intersection(&Circle::new(Pt3D::xy(1.0, 0.0), 1.0))).is_empty());
        assert!(points(c1.intersection(&Circle::new(Pt3D::zero(), 2.0))).is_empty());
        assert_eq!(c1.intersection(&c1), CircleIntersection::Coincident);
    }

    #[test]
    fn intersection_is_symmetric() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        for _ in 0..500 {
            let c1 = Circle::new(
                Pt3D::xy(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)),
                rng.gen_range(1.0..30.0),
            );
            let c2 = Circle::new(
                Pt3D::xy(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)),
                rng.gen_range(1.0..30.0),
            );
            let pts1 = points(c1.intersection(&c2));
            let pts2 = points(c2.intersection(&c1));
            for pt in &pts1 {
                assert!((pt.dist_to(c1.center) - c1.radius).abs() < 1e-5);
                assert!((pt.dist_to(c2.center) - c2.radius).abs() < 1e-5);
            }
            assert!(same_points(pts1, pts2), "{} and {}", c1, c2);
        }
    }
}
