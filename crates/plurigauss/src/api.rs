//! Curated API for the workspace (UNSTABLE).
//!
//! Prefer these re-exports over reaching into submodules.

// Facies and probabilities
pub use crate::facies::{
    normalize_probabilities, validate_probabilities, Facies, FaciesCatalog, FaciesOrdering,
    OverlayGroup, OverlayInterval, OverlayModel,
};
// Polygon geometry
pub use crate::geom2::{
    calibrate_split, clip_halfplane, point_in_polygon, signed_area, split_by_line, CalibratedSplit,
    CalibrationCfg, LineSplit, Point, Polygon,
};
// Rules
pub use crate::rules::spec::{
    AnglePolygonSpec, AngleSpec, BayfillSpec, CubicAxis, CubicNodeSpec, CubicSpec,
    OverlayGroupSpec, ParamSource,
};
pub use crate::rules::{
    AngleRule, BayfillMap, BayfillRegion, BayfillRule, CubicRule, Diagnostics, FaciesPolygon,
    Located, MemoCfg, MouthCase, Rule, RuleCfg, RuleKind, RuleSpec, ShorelineCase,
    TruncationMap, TruncationRule,
};
// Zone evaluation
pub use crate::engine::{
    estimate_frequencies, AlphaField, EngineCfg, FaciesProbability, FrequencyEstimate,
    ProbabilityField, RunReport, TruncationEngine,
};
// Errors
pub use crate::error::{ConfigError, ProbabilityError, TruncationError};
