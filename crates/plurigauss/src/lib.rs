//! Plurigaussian truncation maps.
//!
//! Alpha coordinates in the unit square (or cube) are mapped to facies by
//! locating them in a partition whose regions are calibrated to the facies
//! probabilities of a cell.
//!
//! Layout
//! - `facies`: catalog, overlay groups, probability vectors.
//! - `geom2`: polygon primitives and the calibrated split.
//! - `rules`: the Angle, Cubic and Bayfill rules behind `TruncationRule`.
//! - `engine`: zone-level evaluation over probability and alpha fields.
//!
//! API Policy
//! - The crate is consumed by the workspace CLI. There is no stable public API;
//!   `api` collects the names callers are expected to use.

pub mod api;
pub mod engine;
pub mod error;
pub mod facies;
pub mod geom2;
pub mod rules;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{ConfigError, ProbabilityError, TruncationError};
pub use nalgebra::Vector2 as Vec2;

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::engine::{AlphaField, EngineCfg, ProbabilityField, TruncationEngine};
    pub use crate::facies::{FaciesCatalog, OverlayModel};
    pub use crate::geom2::{Point, Polygon};
    pub use crate::rules::{Located, Rule, RuleCfg, RuleKind, RuleSpec, TruncationRule};
}
