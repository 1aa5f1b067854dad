//! Splitting convex polygons by a line and clipping by half-planes.

use nalgebra::Vector2;

use super::polygon::Polygon;
use super::types::{Point, SIDE_EPS};

/// Result of `split_by_line`.
///
/// When the line misses the interior both halves hold the input polygon and
/// `did_split` is false.
#[derive(Clone, Debug)]
pub struct LineSplit {
    pub near: Polygon,
    pub far: Polygon,
    pub did_split: bool,
}

/// Split a convex polygon by the infinite line through `point` with direction
/// `dir`.
///
/// `near` collects the vertices with `n·(p − point) ≤ 0` (`n` the left normal of
/// `dir`), `far` the others. Vertices on the line and the two edge crossings go
/// to both halves.
pub fn split_by_line(poly: &Polygon, dir: Point, point: Point) -> LineSplit {
    let n = Vector2::new(-dir.y, dir.x);
    let side: Vec<f64> = poly.verts.iter().map(|v| n.dot(&(v - point))).collect();
    let has_near = side.iter().any(|&s| s < -SIDE_EPS);
    let has_far = side.iter().any(|&s| s > SIDE_EPS);
    if !(has_near && has_far) {
        return LineSplit {
            near: poly.clone(),
            far: poly.clone(),
            did_split: false,
        };
    }

    let m = poly.verts.len();
    let mut near = Vec::with_capacity(m + 2);
    let mut far = Vec::with_capacity(m + 2);
    let mut crossings = 0usize;
    for i in 0..m {
        let j = (i + 1) % m;
        let (a, b) = (poly.verts[i], poly.verts[j]);
        let (sa, sb) = (side[i], side[j]);
        if sa <= SIDE_EPS {
            near.push(a);
        }
        if sa >= -SIDE_EPS {
            far.push(a);
        }
        let strict_cross = (sa < -SIDE_EPS && sb > SIDE_EPS) || (sa > SIDE_EPS && sb < -SIDE_EPS);
        if strict_cross {
            let t = sa / (sa - sb);
            let x = a + (b - a) * t;
            near.push(x);
            far.push(x);
            crossings += 1;
        }
    }
    // Convex input crosses at most twice; more means a non-convex or corrupted
    // polygon and the halves are not meaningful.
    debug_assert!(crossings <= 2, "line crossed a convex polygon {crossings} times");
    LineSplit {
        near: Polygon::new(near),
        far: Polygon::new(far),
        did_split: true,
    }
}

/// Split at offset `s` along the unit normal `n` from `origin`, resolving the
/// no-op case into (whole, empty) or (empty, whole).
pub(crate) fn split_at_offset(
    poly: &Polygon,
    n: Point,
    origin: Point,
    s: f64,
) -> (Polygon, Polygon) {
    let dir = Vector2::new(n.y, -n.x);
    let point = origin + n * s;
    let split = split_by_line(poly, dir, point);
    if split.did_split {
        return (split.near, split.far);
    }
    resolve_unsplit(poly, n, point)
}

/// Keep the part of `poly` satisfying `n·p ≤ c`.
pub fn clip_halfplane(poly: &Polygon, n: Point, c: f64) -> Polygon {
    let norm = n.norm();
    if !(norm.is_finite()) || norm <= 0.0 {
        return poly.clone();
    }
    let nu = n / norm;
    let origin = Vector2::zeros();
    split_at_offset(poly, nu, origin, c / norm).0
}

fn resolve_unsplit(poly: &Polygon, n: Point, point: Point) -> (Polygon, Polygon) {
    // Every vertex is on one side (or on the line); decide by the extreme one.
    let max_side = poly
        .verts
        .iter()
        .map(|v| n.dot(&(v - point)))
        .fold(f64::NEG_INFINITY, f64::max);
    if max_side <= SIDE_EPS {
        (poly.clone(), Polygon::empty())
    } else {
        (Polygon::empty(), poly.clone())
    }
}
