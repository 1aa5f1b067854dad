//! 2D polygon geometry for truncation maps on the unit square.
//!
//! Purpose
//! - Value-semantics primitives on small convex polygons: shoelace area,
//!   ray-casting membership, line splits, half-plane clips, and the bisection
//!   that calibrates a split to a target area.
//! - Every operation returns new polygons; nothing is mutated in place.
//!
//! Conventions
//! - Polygons are implicitly closed vertex lists. Orientation is not enforced;
//!   `Polygon::area` takes the absolute value of the signed shoelace sum.
//! - A line is given by a direction `d` and a point `q`. Its "near" side is
//!   `n·(p − q) ≤ 0` with `n = (−d.y, d.x)` the left normal of `d`.
//! - Tolerances live in `CalibrationCfg` and the module constants in `types`.

mod calibrate;
mod polygon;
mod split;
mod types;

pub use calibrate::{calibrate_split, CalibratedSplit};
pub use polygon::{point_in_polygon, signed_area, Polygon};
pub use split::{clip_halfplane, split_by_line, LineSplit};
pub use types::{CalibrationCfg, Point, Side, SIDE_EPS};
