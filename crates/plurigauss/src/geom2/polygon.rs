//! Vertex-list polygons: area, membership, bounds.

use nalgebra::Vector2;

use super::types::Point;

/// Implicitly closed polygon. Degenerate polygons (fewer than three vertices)
/// are valid values: they have zero area and contain no point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    pub verts: Vec<Point>,
}

impl Polygon {
    #[inline]
    pub fn new(verts: Vec<Point>) -> Self {
        Self { verts }
    }

    /// The empty polygon used for slots that own no area.
    #[inline]
    pub fn empty() -> Self {
        Self { verts: Vec::new() }
    }

    /// `[0,1]²` in counterclockwise order starting at the origin.
    pub fn unit_square() -> Self {
        Self::rect(0.0, 0.0, 1.0, 1.0)
    }

    /// Axis-aligned rectangle `[x0,x1]×[y0,y1]`, counterclockwise.
    pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            verts: vec![
                Vector2::new(x0, y0),
                Vector2::new(x1, y0),
                Vector2::new(x1, y1),
                Vector2::new(x0, y1),
            ],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.verts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// Fewer than three vertices or (numerically) zero area.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.verts.len() < 3 || self.area() <= f64::EPSILON
    }

    /// Absolute shoelace area.
    #[inline]
    pub fn area(&self) -> f64 {
        signed_area(&self.verts).abs()
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        point_in_polygon(&self.verts, p)
    }

    /// Vertex average. `None` for an empty polygon.
    pub fn centroid(&self) -> Option<Point> {
        if self.verts.is_empty() {
            return None;
        }
        let sum = self
            .verts
            .iter()
            .fold(Vector2::zeros(), |acc: Point, v| acc + v);
        Some(sum / self.verts.len() as f64)
    }

    /// Range of `n·(v − origin)` over all vertices.
    pub fn projection_range(&self, n: Point, origin: Point) -> Option<(f64, f64)> {
        let mut it = self.verts.iter().map(|v| n.dot(&(v - origin)));
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s))))
    }
}

/// Signed shoelace area; positive for counterclockwise vertex order.
pub fn signed_area(verts: &[Point]) -> f64 {
    let m = verts.len();
    if m < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..m {
        let a = verts[i];
        let b = verts[(i + 1) % m];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc
}

/// Ray-casting parity test with a horizontal ray towards `+x`.
///
/// An edge counts when it straddles the ray height (half-open in `y`) and its
/// crossing lies strictly to the right of `p` (`p.x < x_cross`). Points on the
/// right or top boundary of a partition are therefore claimed by no polygon;
/// callers handle that with a nudge-and-retry.
pub fn point_in_polygon(verts: &[Point], p: Point) -> bool {
    let m = verts.len();
    if m < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = m - 1;
    for i in 0..m {
        let vi = verts[i];
        let vj = verts[j];
        if (vi.y > p.y) != (vj.y > p.y) {
            let x_cross = (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
