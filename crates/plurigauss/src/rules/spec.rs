//! Serializable rule definitions and their validation against a zone.
//!
//! A `RuleSpec` is what the model-definition layer hands over; `Rule::configure`
//! turns it into a validated rule. The `rule` tag selects the variant:
//!
//! ```json
//! { "rule": "angle",
//!   "polygons": [ { "facies": "F1", "angle": -90.0 },
//!                 { "facies": "F2", "angle": { "trend": "azimuth" }, "fraction": 1.0 } ],
//!   "overlay":  [ { "background": ["F1"], "overlay": "F3", "center": 0.5 } ] }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::facies::{FaciesCatalog, OverlayGroup, OverlayModel};

use super::RuleKind;

/// Tolerance on the per-facies sum of probability fractions.
pub const FRACTION_SUM_TOL: f64 = 1e-3;

fn one() -> f64 {
    1.0
}

fn half() -> f64 {
    0.5
}

/// Rule definition, tagged by rule name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "lowercase")]
pub enum RuleSpec {
    Angle(AngleSpec),
    Cubic(CubicSpec),
    Bayfill(BayfillSpec),
}

impl RuleSpec {
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleSpec::Angle(_) => RuleKind::Angle,
            RuleSpec::Cubic(_) => RuleKind::Cubic,
            RuleSpec::Bayfill(_) => RuleKind::Bayfill,
        }
    }
}

/// A scalar that is either fixed for the zone or read per cell from a trend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamSource {
    Constant(f64),
    Trend { trend: String },
}

impl ParamSource {
    /// Value to use before any trend values were pushed.
    pub fn initial(&self) -> f64 {
        match self {
            ParamSource::Constant(v) => *v,
            ParamSource::Trend { .. } => 0.0,
        }
    }

    pub fn trend(&self) -> Option<&str> {
        match self {
            ParamSource::Constant(_) => None,
            ParamSource::Trend { trend } => Some(trend),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AngleSpec {
    pub polygons: Vec<AnglePolygonSpec>,
    #[serde(default)]
    pub overlay: Vec<OverlayGroupSpec>,
}

/// One polygon slot: facies, boundary-line angle in degrees (anticlockwise
/// from the alpha1 axis) and the share of the facies probability it takes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnglePolygonSpec {
    pub facies: String,
    pub angle: ParamSource,
    #[serde(default = "one")]
    pub fraction: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayGroupSpec {
    pub background: Vec<String>,
    pub overlay: String,
    #[serde(default = "half")]
    pub center: f64,
}

/// Axis along which a cubic level is partitioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CubicAxis {
    X,
    Y,
}

impl CubicAxis {
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            CubicAxis::X => CubicAxis::Y,
            CubicAxis::Y => CubicAxis::X,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicSpec {
    /// Axis of the first level; deeper levels alternate.
    pub axis: CubicAxis,
    pub nodes: Vec<CubicNodeSpec>,
    #[serde(default)]
    pub overlay: Vec<OverlayGroupSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CubicNodeSpec {
    Leaf {
        facies: String,
        #[serde(default = "one")]
        fraction: f64,
    },
    Group {
        split: Vec<CubicNodeSpec>,
    },
}

/// Five facies roles and the three shape parameters of the bayfill rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BayfillSpec {
    pub floodplain: String,
    pub subbay: String,
    pub wave_influenced: String,
    pub bayhead_delta: String,
    pub lagoon: String,
    /// Floodplain slant factor in [0,1].
    pub sf: ParamSource,
    /// Subbay extent fraction in [0,1].
    pub ysf: f64,
    /// Bayhead-delta slant fraction in [0,1].
    pub sbhd: f64,
}

/// Resolved polygon slot: zone facies index and probability fraction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slot {
    pub facies: usize,
    pub fraction: f64,
}

/// Resolve `(facies, fraction)` entries and overlay groups against the zone.
///
/// Checks: every fraction in [0,1]; fractions of each facies sum to 1; overlay
/// facies are not polygon facies; backgrounds are polygon facies; polygon and
/// overlay facies together are exactly the zone's facies.
pub(crate) fn resolve_slots(
    entries: &[(&str, f64)],
    overlay: &[OverlayGroupSpec],
    catalog: &FaciesCatalog,
) -> Result<(Vec<Slot>, OverlayModel), ConfigError> {
    if entries.is_empty() {
        return Err(ConfigError::NoPolygons);
    }
    let mut rule_facies: Vec<String> = Vec::new();
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for &(name, fraction) in entries {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ConfigError::FractionOutOfRange {
                facies: name.to_string(),
                value: fraction,
            });
        }
        if !sums.contains_key(name) {
            rule_facies.push(name.to_string());
        }
        *sums.entry(name).or_insert(0.0) += fraction;
    }
    for name in &rule_facies {
        let sum = sums[name.as_str()];
        if (sum - 1.0).abs() > FRACTION_SUM_TOL {
            return Err(ConfigError::FractionSum {
                facies: name.clone(),
                sum,
            });
        }
    }
    for g in overlay {
        if sums.contains_key(g.overlay.as_str()) || rule_facies.contains(&g.overlay) {
            return Err(ConfigError::OverlayConflict(g.overlay.clone()));
        }
        for b in &g.background {
            if !sums.contains_key(b.as_str()) {
                return Err(ConfigError::BackgroundNotInRule(b.clone()));
            }
        }
        rule_facies.push(g.overlay.clone());
    }
    catalog.ordering(&rule_facies)?;

    let slots = entries
        .iter()
        .map(|&(name, fraction)| {
            Ok(Slot {
                facies: catalog.require(name)?,
                fraction,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    let groups = overlay
        .iter()
        .map(|g| {
            Ok(OverlayGroup {
                background: g
                    .background
                    .iter()
                    .map(|b| catalog.require(b))
                    .collect::<Result<Vec<_>, _>>()?,
                overlay: catalog.require(&g.overlay)?,
                center: g.center,
            })
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    let model = OverlayModel::new(groups, catalog)?;
    Ok((slots, model))
}
