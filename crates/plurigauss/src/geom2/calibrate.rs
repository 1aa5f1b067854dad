//! Bisection search for the split line that cuts off a target area.

use tracing::warn;

use super::polygon::Polygon;
use super::split::split_at_offset;
use super::types::{CalibrationCfg, Point, Side};

/// Outcome of `calibrate_split`.
#[derive(Clone, Debug)]
pub struct CalibratedSplit {
    /// Sub-polygon on the reference side of the line.
    pub near: Polygon,
    pub far: Polygon,
    /// The half with the smaller area.
    pub smaller: Side,
    /// Offset of the final line from the reference point along the normal.
    pub offset: f64,
    /// `area(near) − target`.
    pub area_error: f64,
    /// False when `|area_error| > warn_tol` after the iteration budget.
    pub converged: bool,
}

/// Find the line with normal `normal` (offset `s` from `ref_point`) whose near
/// side has area `target_area`.
///
/// The family is swept over `s ∈ [s_min, s_max]`, the projections of the
/// polygon's vertices onto `normal`; the near-side area grows monotonically in
/// `s`, so plain bisection applies. `normal` need not be unit length.
///
/// Targets at or beyond the polygon's extent return the trivial split without
/// iterating. The returned split is the best one seen; a warning is logged
/// when its error stays above `cfg.warn_tol`.
pub fn calibrate_split(
    poly: &Polygon,
    normal: Point,
    ref_point: Point,
    target_area: f64,
    cfg: &CalibrationCfg,
) -> CalibratedSplit {
    let total = poly.area();
    let norm = normal.norm();
    let range = poly.projection_range(normal, ref_point);
    let (n, (s_min, s_max)) = match range {
        Some((lo, hi)) if norm > 0.0 && norm.is_finite() => (normal / norm, (lo / norm, hi / norm)),
        _ => return trivial(poly.clone(), Polygon::empty(), 0.0, total - target_area),
    };
    if target_area <= 0.0 {
        return trivial(Polygon::empty(), poly.clone(), s_min, -target_area);
    }
    if target_area >= total {
        return trivial(poly.clone(), Polygon::empty(), s_max, total - target_area);
    }

    let mut lo = s_min;
    let mut hi = s_max;
    let mut best: Option<(Polygon, Polygon, f64, f64)> = None;
    for _ in 0..cfg.max_iterations.max(1) {
        let s = 0.5 * (lo + hi);
        let (near, far) = split_at_offset(poly, n, ref_point, s);
        let err = near.area() - target_area;
        let better = best.as_ref().map_or(true, |(_, _, _, e)| err.abs() < e.abs());
        if better {
            best = Some((near, far, s, err));
        }
        if err.abs() <= cfg.area_tol {
            break;
        }
        if err > 0.0 {
            hi = s;
        } else {
            lo = s;
        }
    }

    let Some((near, far, offset, area_error)) = best else {
        return trivial(poly.clone(), Polygon::empty(), s_max, total - target_area);
    };
    let converged = area_error.abs() <= cfg.warn_tol;
    if !converged {
        warn!(
            target_area,
            area_error,
            iterations = cfg.max_iterations,
            "split calibration did not converge; using best split"
        );
    }
    let smaller = if near.area() <= far.area() {
        Side::Near
    } else {
        Side::Far
    };
    CalibratedSplit {
        near,
        far,
        smaller,
        offset,
        area_error,
        converged,
    }
}

fn trivial(near: Polygon, far: Polygon, offset: f64, area_error: f64) -> CalibratedSplit {
    let smaller = if near.area() <= far.area() {
        Side::Near
    } else {
        Side::Far
    };
    CalibratedSplit {
        near,
        far,
        smaller,
        offset,
        area_error,
        converged: true,
    }
}
