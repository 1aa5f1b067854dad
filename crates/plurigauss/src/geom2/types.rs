//! Basic 2D types and tolerances shared by the split/calibration routines.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Point in the alpha plane.
pub type Point = Vector2<f64>;

/// Vertices whose signed distance to a cutting line is within this slack are
/// treated as lying on the line and go to both halves.
pub const SIDE_EPS: f64 = 1e-12;

/// Which half of a split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// `n·(p − q) ≤ 0`, the half containing the reference corner.
    Near,
    Far,
}

/// Bisection settings for `calibrate_split`.
///
/// The search stops as soon as the near-side area is within `area_tol` of the
/// target. A result whose error still exceeds `warn_tol` after
/// `max_iterations` is reported as non-convergent.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    pub max_iterations: u32,
    pub area_tol: f64,
    pub warn_tol: f64,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            area_tol: 0.01,
            warn_tol: 0.02,
        }
    }
}
