use anyhow::Result;

use geom::{GeometryError, Line, LineSegment, Pt3D, CONTIGUITY_DECIMALS, EPSILON};

// Consecutive segments turning more than this (in degrees) double back on themselves
const REVERSAL_DEGREES: f64 = 180.0 - 1e-9;
// Outer corners reach at most this many offsets away from the centerline vertex
const MITER_LIMIT: f64 = 2.0;
// A vertex merged away by a collapse still pairs with a centerline vertex this close, in relative
// arclength
const PAIRING_TOLERANCE: f64 = 0.01;

// A corner of the offset curve, remembering which centerline vertex it came from. Vertices
// created by merging collapsed corners don't come from any single one.
#[derive(Clone, Copy)]
struct OffsetVertex {
    pt: Pt3D,
    source: Option<usize>,
}

/// Shifts a centerline sideways by `offset` meters, positive being to the right of the direction
/// of travel. The result has exactly one point per input point.
///
/// Outer corners are mitered, clipped to twice the offset on sharp bends. On the inner side of a
/// bend, stretches too short to survive the offset collapse into the corner of their neighbors;
/// the centerline vertices they carried get re-paired by relative arclength or interpolated
/// along the offset curve.
///
/// Fails if the centerline crosses itself, comes back to where it started or reverses direction,
/// and if the whole offset collapses. A zero offset returns the centerline untouched, even if
/// it's closed.
pub fn offset_centerline(pts: &[Pt3D], offset: f64) -> Result<Vec<Pt3D>> {
    if pts.len() < 2 {
        return Err(GeometryError::NotEnoughPoints(pts.len()).into());
    }
    for pair in pts.windows(2) {
        if pair[0].almost_equal_to(pair[1], CONTIGUITY_DECIMALS) {
            return Err(GeometryError::Degenerate(format!(
                "centerline repeats {}",
                pair[0]
            ))
            .into());
        }
    }
    if offset == 0.0 {
        return Ok(pts.to_vec());
    }
    check_simple(pts)?;

    let directions: Vec<Pt3D> = pts
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).normalized())
        .collect::<Result<_>>()?;
    let shifted: Vec<LineSegment> = pts
        .windows(2)
        .zip(&directions)
        .map(|(pair, dir)| {
            let shift = Pt3D::xy(dir.y(), -dir.x()) * offset;
            LineSegment::new(pair[0] + shift, pair[1] + shift)
        })
        .collect();
    let lines: Vec<Line> = shifted
        .iter()
        .map(|seg| Line::new(seg.start_point(), seg.end_point()))
        .collect::<Result<_>>()?;

    let mut vertices = vec![OffsetVertex {
        pt: shifted[0].start_point(),
        source: Some(0),
    }];
    for idx in 1..pts.len() - 1 {
        vertices.push(OffsetVertex {
            pt: corner(pts[idx], offset, &directions, &shifted, &lines, idx),
            source: Some(idx),
        });
    }
    vertices.push(OffsetVertex {
        pt: shifted[shifted.len() - 1].end_point(),
        source: Some(pts.len() - 1),
    });

    // The centerline segment each offset segment still follows
    let mut segments: Vec<usize> = (0..shifted.len()).collect();
    remove_collapsed(&mut vertices, &mut segments, &directions, &lines)?;
    Ok(pair_with_centerline(pts, &vertices))
}

// Where the offsets of the segments before and after a centerline vertex meet
fn corner(
    vertex: Pt3D,
    offset: f64,
    directions: &[Pt3D],
    shifted: &[LineSegment],
    lines: &[Line],
    idx: usize,
) -> Pt3D {
    let miter = match lines[idx - 1].intersection(&lines[idx]) {
        Some(pt) => pt,
        // Collinear segments
        None => return shifted[idx - 1].end_point(),
    };
    let turn = directions[idx - 1].angle_to(directions[idx]);
    // Turning left puts the right side on the outside, and vice versa
    let outside = turn * offset > 0.0;
    let limit = MITER_LIMIT * offset.abs();
    if outside && vertex.dist_to(miter) > limit {
        if let Ok(dir) = (miter - vertex).normalized() {
            return vertex + dir * limit;
        }
    }
    miter
}

// An offset segment pointing against its centerline segment has been squeezed out by the bend.
// Drop it and let its neighbors meet directly, until nothing runs backwards.
fn remove_collapsed(
    vertices: &mut Vec<OffsetVertex>,
    segments: &mut Vec<usize>,
    directions: &[Pt3D],
    lines: &[Line],
) -> Result<()> {
    loop {
        let reversed = (0..segments.len()).find(|idx| {
            (vertices[idx + 1].pt - vertices[*idx].pt).dot(directions[segments[*idx]]) < -EPSILON
        });
        let idx = match reversed {
            Some(idx) => idx,
            None => return Ok(()),
        };
        if segments.len() == 1 {
            return Err(collapsed());
        }

        let last = segments.len() - 1;
        if idx == 0 {
            // The lane now starts where the next offset line is closest to the old start
            let next = lines[segments[1]];
            let start = vertices[0].pt;
            let pt = next
                .intersection(&next.perpendicular_line_at(start))
                .ok_or_else(collapsed)?;
            vertices[0].pt = pt;
            vertices.remove(1);
        } else if idx == last {
            let prev = lines[segments[last - 1]];
            let end = vertices[last + 1];
            let pt = prev
                .intersection(&prev.perpendicular_line_at(end.pt))
                .ok_or_else(collapsed)?;
            vertices[last] = OffsetVertex {
                pt,
                source: end.source,
            };
            vertices.remove(last + 1);
        } else {
            let pt = lines[segments[idx - 1]]
                .intersection(&lines[segments[idx + 1]])
                .ok_or_else(collapsed)?;
            vertices[idx] = OffsetVertex { pt, source: None };
            vertices.remove(idx + 1);
        }
        segments.remove(idx);
    }
}

fn collapsed() -> anyhow::Error {
    GeometryError::Degenerate("the offset collapses on the inside of a bend".to_string()).into()
}

// Every centerline vertex gets the offset vertex it produced. Vertices lost to a collapse take a
// merged vertex at about the same relative arclength, or else the point at their relative
// arclength along the offset curve.
fn pair_with_centerline(pts: &[Pt3D], vertices: &[OffsetVertex]) -> Vec<Pt3D> {
    let centerline = relative_arclengths(pts);
    let offset_pts: Vec<Pt3D> = vertices.iter().map(|v| v.pt).collect();
    let along_offset = relative_arclengths(&offset_pts);

    let mut result = Vec::with_capacity(pts.len());
    let mut used = vec![false; vertices.len()];
    // Never go backwards along the offset curve
    let mut floor = 0.0;
    for (idx, target) in centerline.iter().enumerate() {
        let own = vertices.iter().position(|v| v.source == Some(idx));
        let merged = || {
            vertices
                .iter()
                .enumerate()
                .filter(|(v, vertex)| {
                    vertex.source.is_none()
                        && !used[*v]
                        && along_offset[*v] >= floor
                        && (along_offset[*v] - target).abs() <= PAIRING_TOLERANCE
                })
                .min_by(|a, b| {
                    (along_offset[a.0] - target)
                        .abs()
                        .total_cmp(&(along_offset[b.0] - target).abs())
                })
                .map(|(v, _)| v)
        };
        match own.or_else(merged) {
            Some(v) => {
                used[v] = true;
                floor = along_offset[v];
                result.push(vertices[v].pt);
            }
            None => {
                floor = target.max(floor);
                result.push(point_at_relative(&offset_pts, &along_offset, floor));
            }
        }
    }
    result
}

// Each point's distance along the polyline, as a fraction of the total length
fn relative_arclengths(pts: &[Pt3D]) -> Vec<f64> {
    let mut cumulative = vec![0.0];
    for pair in pts.windows(2) {
        cumulative.push(cumulative[cumulative.len() - 1] + pair[0].dist_to(pair[1]));
    }
    let total = cumulative[cumulative.len() - 1];
    if total == 0.0 {
        return cumulative;
    }
    cumulative.into_iter().map(|dist| dist / total).collect()
}

fn point_at_relative(pts: &[Pt3D], along: &[f64], fraction: f64) -> Pt3D {
    for idx in 0..pts.len() - 1 {
        if fraction <= along[idx + 1] {
            let span = along[idx + 1] - along[idx];
            if span <= 0.0 {
                return pts[idx];
            }
            let t = (fraction - along[idx]) / span;
            return pts[idx] + (pts[idx + 1] - pts[idx]) * t;
        }
    }
    pts[pts.len() - 1]
}

fn check_simple(pts: &[Pt3D]) -> Result<()> {
    if pts.len() > 2 && pts[0].almost_equal_to(pts[pts.len() - 1], 5) {
        return Err(GeometryError::SelfIntersecting.into());
    }
    let segments: Vec<LineSegment> = pts
        .windows(2)
        .map(|pair| LineSegment::new(pair[0], pair[1]))
        .collect();
    for pair in segments.windows(2) {
        let turn = (pair[0].end_point() - pair[0].start_point())
            .angle_to(pair[1].end_point() - pair[1].start_point());
        if turn.abs() >= REVERSAL_DEGREES {
            return Err(GeometryError::SelfIntersecting.into());
        }
    }
    for (idx1, seg1) in segments.iter().enumerate() {
        for seg2 in segments.iter().skip(idx1 + 2) {
            if seg1.find_intersection(seg2).is_some() {
                return Err(GeometryError::SelfIntersecting.into());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<Pt3D> {
        raw.iter().map(|(x, y)| Pt3D::xy(*x, *y)).collect()
    }

    fn assert_pts(actual: Vec<Pt3D>, expected: Vec<Pt3D>) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.into_iter().zip(expected) {
            assert!(a.almost_equal_to(e, 5), "{} != {}", a, e);
        }
    }

    // Every offset segment heads the same way as its centerline segment
    fn assert_same_direction(centerline: &[Pt3D], offset: &[Pt3D]) {
        for (orig, shifted) in centerline.windows(2).zip(offset.windows(2)) {
            assert!(
                (orig[1] - orig[0]).dot(shifted[1] - shifted[0]) >= 0.0,
                "{} -> {} runs against {} -> {}",
                shifted[0],
                shifted[1],
                orig[0],
                orig[1]
            );
        }
    }

    #[test]
    fn zero_offset_is_the_centerline() {
        let line = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 0.0)]);
        assert_eq!(offset_centerline(&line, 0.0).unwrap(), line);
    }

    #[test]
    fn right_angle_corner() {
        assert_pts(
            offset_centerline(&pts(&[(0.0, 100.0), (200.0, 100.0), (200.0, 0.0)]), 5.0).unwrap(),
            pts(&[(0.0, 95.0), (195.0, 95.0), (195.0, 0.0)]),
        );
    }

    #[test]
    fn negative_offset_goes_left() {
        assert_pts(
            offset_centerline(
                &pts(&[(0.0, 0.0), (0.0, 100.0), (100.0, 100.0), (100.0, 0.0)]),
                -5.0,
            )
            .unwrap(),
            pts(&[(-5.0, 0.0), (-5.0, 105.0), (105.0, 105.0), (105.0, 0.0)]),
        );
    }

    #[test]
    fn collinear_points_stay_put() {
        assert_pts(
            offset_centerline(&pts(&[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]), 2.0).unwrap(),
            pts(&[(0.0, -2.0), (5.0, -2.0), (10.0, -2.0)]),
        );
    }

    #[test]
    fn sharp_outer_corners_are_clipped() {
        let hairpin = pts(&[(0.0, 0.0), (100.0, 0.0), (0.0, 0.5)]);
        let result = offset_centerline(&hairpin, 2.0).unwrap();
        assert_eq!(result.len(), 3);
        assert!(result[1].dist_to(hairpin[1]) <= 4.0 + 1e-9);
        assert!(result[1].x() > 100.0);
        assert_same_direction(&hairpin, &result);
    }

    #[test]
    fn short_inner_stretches_collapse() {
        // The diagonal is too short to survive 2 meters to the inside of the bend
        let centerline = pts(&[(0.0, 0.0), (10.0, 0.0), (11.0, 1.0), (11.0, 11.0)]);
        let result = offset_centerline(&centerline, -2.0).unwrap();
        assert_same_direction(&centerline, &result);

        // The two inner corners merge into (9, 2); the vertices end up at their share of the
        // offset curve's length instead
        let total = 20.0 + 2_f64.sqrt();
        let first = 18.0 * 10.0 / total;
        let second = 18.0 * (10.0 + 2_f64.sqrt()) / total;
        assert_pts(
            result,
            vec![
                Pt3D::xy(0.0, 2.0),
                Pt3D::xy(first, 2.0),
                Pt3D::xy(9.0, 2.0 + second - 9.0),
                Pt3D::xy(9.0, 11.0),
            ],
        );
    }

    #[test]
    fn short_first_stretch_collapses() {
        let centerline = pts(&[(0.0, 0.0), (1.0, 0.0), (1.0, 10.0)]);
        let result = offset_centerline(&centerline, -2.0).unwrap();
        assert_same_direction(&centerline, &result);
        // The lane starts at the corner, and the old corner sits where it used to, relatively
        assert_pts(
            result,
            pts(&[(-1.0, 2.0), (-1.0, 2.0 + 8.0 / 11.0), (-1.0, 10.0)]),
        );
    }

    #[test]
    fn bad_centerlines() {
        assert!(offset_centerline(&pts(&[(0.0, 0.0)]), 1.0).is_err());
        assert!(offset_centerline(&pts(&[(0.0, 0.0), (0.0, 0.0)]), 1.0).is_err());

        let closed = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 0.0)]);
        let err = offset_centerline(&closed, 1.0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GeometryError>(),
            Some(&GeometryError::SelfIntersecting)
        );

        let crossing = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (5.0, -5.0)]);
        assert!(offset_centerline(&crossing, 1.0).is_err());

        let reversal = pts(&[(0.0, 0.0), (10.0, 0.0), (5.0, 0.0)]);
        assert!(offset_centerline(&reversal, 1.0).is_err());

        // A U-turn narrower than twice the offset leaves nothing on the inside
        let narrow_u = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 1.0), (0.0, 1.0)]);
        let err = offset_centerline(&narrow_u, -2.0).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GeometryError>(),
            Some(GeometryError::Degenerate(_))
        ));
    }
}
