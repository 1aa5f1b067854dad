//! Truncation rules: the shared lookup contract and its three implementations.
//!
//! Purpose
//! - `TruncationRule` is the contract every rule kind implements: push
//!   per-cell trend values and probabilities, then `locate` alpha coordinates.
//! - `Rule` is the closed set of kinds (Angle, Cubic, Bayfill); `RuleKind`
//!   maps rule names to variants and `Rule::configure` builds one from a
//!   `RuleSpec`.
//!
//! Lifecycle
//! - Configuration is validated once and read-only afterwards.
//! - The partition is derived state, rebuilt (or taken from the memo cache)
//!   on every `set_probabilities`.

mod angle;
mod bayfill;
mod cubic;
mod diag;
mod map;
mod memo;
pub mod spec;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, TruncationError};
use crate::facies::FaciesCatalog;
use crate::geom2::{CalibrationCfg, Polygon};

pub use angle::AngleRule;
pub use bayfill::{BayfillMap, BayfillRegion, BayfillRule, MouthCase, ShorelineCase};
pub use cubic::CubicRule;
pub use diag::{Counters, Diagnostics};
pub use map::{MapSlot, TruncationMap};
pub use memo::{MemoCache, MemoCfg};
pub use spec::RuleSpec;

/// Rule-level settings shared by all kinds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleCfg {
    /// Allowed deviation of the probability sum from 1.
    pub sum_tol: f64,
    /// A facies with probability at least `1 − determined_eps` bypasses geometry.
    pub determined_eps: f64,
    /// Coordinate shift used for the single boundary retry in `locate`.
    pub nudge: f64,
    pub calibration: CalibrationCfg,
    /// `None` disables memoization.
    pub memo: Option<MemoCfg>,
}

impl Default for RuleCfg {
    fn default() -> Self {
        Self {
            sum_tol: 1e-3,
            determined_eps: 1e-3,
            nudge: 1e-6,
            calibration: CalibrationCfg::default(),
            memo: None,
        }
    }
}

/// Kind of truncation rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Angle,
    Cubic,
    Bayfill,
}

impl FromStr for RuleKind {
    type Err = ConfigError;

    /// Accepts the short names and the model-file identifiers.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "angle" | "trunc2d_angle" => Ok(RuleKind::Angle),
            "cubic" | "trunc2d_cubic" => Ok(RuleKind::Cubic),
            "bayfill" | "trunc3d_bayfill" => Ok(RuleKind::Bayfill),
            _ => Err(ConfigError::UnknownRule(s.to_string())),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleKind::Angle => "angle",
            RuleKind::Cubic => "cubic",
            RuleKind::Bayfill => "bayfill",
        };
        f.write_str(name)
    }
}

/// Result of a lookup: global facies code and zone facies index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Located {
    pub code: i32,
    pub index: usize,
}

/// One polygon of the current partition, for export and plotting.
#[derive(Clone, Debug, PartialEq)]
pub struct FaciesPolygon {
    pub slot: usize,
    /// Zone facies index.
    pub facies: usize,
    pub code: i32,
    pub polygon: Polygon,
}

/// Contract shared by all rule kinds.
pub trait TruncationRule {
    fn kind(&self) -> RuleKind;

    fn catalog(&self) -> &FaciesCatalog;

    /// Number of alpha components `locate` expects.
    fn alpha_dims(&self) -> usize;

    /// Names of the per-cell trends this rule reads, in the order
    /// `set_trend_values` expects them.
    fn trend_names(&self) -> Vec<String>;

    /// Per-cell trend values for the next `set_probabilities`.
    fn set_trend_values(&mut self, values: &[f64]) -> Result<(), TruncationError>;

    /// Probabilities in zone facies order; rebuilds the partition.
    fn set_probabilities(&mut self, probs: &[f64]) -> Result<(), TruncationError>;

    fn locate(&self, alpha: &[f64]) -> Result<Located, TruncationError>;

    fn current_polygons(&self) -> Result<Vec<FaciesPolygon>, TruncationError>;

    fn diagnostics(&self) -> Diagnostics;

    fn reset_diagnostics(&self);
}

/// Closed set of rule kinds.
#[derive(Clone, Debug)]
pub enum Rule {
    Angle(AngleRule),
    Cubic(CubicRule),
    Bayfill(BayfillRule),
}

impl Rule {
    /// Build and validate a rule for `catalog`.
    pub fn configure(
        spec: &RuleSpec,
        catalog: &FaciesCatalog,
        cfg: RuleCfg,
    ) -> Result<Self, ConfigError> {
        let rule = match spec {
            RuleSpec::Angle(s) => Rule::Angle(AngleRule::new(s, catalog, cfg)?),
            RuleSpec::Cubic(s) => Rule::Cubic(CubicRule::new(s, catalog, cfg)?),
            RuleSpec::Bayfill(s) => Rule::Bayfill(BayfillRule::new(s, catalog, cfg)?),
        };
        tracing::debug!(
            kind = %rule.kind(),
            facies = catalog.len(),
            alpha_dims = rule.alpha_dims(),
            "configured truncation rule"
        );
        Ok(rule)
    }

    fn as_dyn(&self) -> &dyn TruncationRule {
        match self {
            Rule::Angle(r) => r,
            Rule::Cubic(r) => r,
            Rule::Bayfill(r) => r,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn TruncationRule {
        match self {
            Rule::Angle(r) => r,
            Rule::Cubic(r) => r,
            Rule::Bayfill(r) => r,
        }
    }
}

impl TruncationRule for Rule {
    fn kind(&self) -> RuleKind {
        self.as_dyn().kind()
    }

    fn catalog(&self) -> &FaciesCatalog {
        self.as_dyn().catalog()
    }

    fn alpha_dims(&self) -> usize {
        self.as_dyn().alpha_dims()
    }

    fn trend_names(&self) -> Vec<String> {
        self.as_dyn().trend_names()
    }

    fn set_trend_values(&mut self, values: &[f64]) -> Result<(), TruncationError> {
        self.as_dyn_mut().set_trend_values(values)
    }

    fn set_probabilities(&mut self, probs: &[f64]) -> Result<(), TruncationError> {
        self.as_dyn_mut().set_probabilities(probs)
    }

    #[inline]
    fn locate(&self, alpha: &[f64]) -> Result<Located, TruncationError> {
        match self {
            Rule::Angle(r) => r.locate(alpha),
            Rule::Cubic(r) => r.locate(alpha),
            Rule::Bayfill(r) => r.locate(alpha),
        }
    }

    fn current_polygons(&self) -> Result<Vec<FaciesPolygon>, TruncationError> {
        self.as_dyn().current_polygons()
    }

    fn diagnostics(&self) -> Diagnostics {
        self.as_dyn().diagnostics()
    }

    fn reset_diagnostics(&self) {
        self.as_dyn().reset_diagnostics()
    }
}

/// Check the alpha length shared by all `locate` implementations.
#[inline]
pub(crate) fn check_alpha(alpha: &[f64], expected: usize) -> Result<(), TruncationError> {
    if alpha.len() < expected {
        return Err(TruncationError::AlphaDimension {
            expected,
            got: alpha.len(),
        });
    }
    Ok(())
}

/// Export helper: slots of `map` as facies polygons.
pub(crate) fn map_polygons(map: &TruncationMap, catalog: &FaciesCatalog) -> Vec<FaciesPolygon> {
    map.slots
        .iter()
        .enumerate()
        .map(|(slot, s)| FaciesPolygon {
            slot,
            facies: s.facies,
            code: catalog.code(s.facies),
            polygon: s.polygon.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests;
