/// Normalizes any angle in degrees to [0, 360).
pub fn normalize_heading(degs: f64) -> f64 {
    let result = degs % 360.0;
    let result = if result < 0.0 { result + 360.0 } else { result };
    // Adding 360 to a tiny negative value rounds to 360
    if result >= 360.0 {
        0.0
    } else {
        result
    }
}

/// The signed turn needed to go from one heading to another, in (-180, 180]. Positive means
/// counter-clockwise (a left turn).
pub fn heading_delta(from: f64, to: f64) -> f64 {
    let delta = normalize_heading(to - from);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizing() {
        for (input, expected) in [
            (0.0, 0.0),
            (360.0, 0.0),
            (-90.0, 270.0),
            (450.0, 90.0),
            (-720.0, 0.0),
            (-1e-17, 0.0),
        ] {
            assert_eq!(normalize_heading(input), expected, "normalizing {}", input);
        }
    }

    #[test]
    fn deltas() {
        for (from, to, expected) in [
            (0.0, 90.0, 90.0),
            (90.0, 0.0, -90.0),
            (350.0, 10.0, 20.0),
            (10.0, 350.0, -20.0),
            (0.0, 180.0, 180.0),
            (-45.0, 315.0, 0.0),
        ] {
            assert!(
                (heading_delta(from, to) - expected).abs() < 1e-9,
                "{} -> {}",
                from,
                to
            );
        }
    }
}
