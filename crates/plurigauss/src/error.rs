//! Error types surfaced by configuration, probability validation and lookup.

use thiserror::Error;

/// Fatal problems detected while configuring a rule for a zone.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("facies '{0}' is listed more than once")]
    DuplicateFacies(String),
    #[error("facies code {0} is used by more than one facies")]
    DuplicateCode(i32),
    #[error("facies '{0}' is not defined in the zone")]
    UnknownFacies(String),
    #[error("rule facies {rule:?} do not match zone facies {zone:?}")]
    FaciesSetMismatch { rule: Vec<String>, zone: Vec<String> },
    #[error("probability fraction {value} for facies '{facies}' is outside [0,1]")]
    FractionOutOfRange { facies: String, value: f64 },
    #[error("probability fractions for facies '{facies}' sum to {sum}, expected 1")]
    FractionSum { facies: String, sum: f64 },
    #[error("overlay group for '{overlay}' has no background facies")]
    EmptyOverlayGroup { overlay: String },
    #[error("background facies '{0}' is already claimed by another overlay group")]
    BackgroundClaimed(String),
    #[error("background facies '{0}' does not own any polygon of the rule")]
    BackgroundNotInRule(String),
    #[error("overlay facies '{0}' is also used as a background or polygon facies")]
    OverlayConflict(String),
    #[error("truncation center {center} for overlay facies '{overlay}' is outside [0,1]")]
    CenterOutOfRange { overlay: String, center: f64 },
    #[error("parameter '{name}' = {value} is outside its valid range")]
    ParameterOutOfRange { name: String, value: f64 },
    #[error("rule defines no polygons")]
    NoPolygons,
    #[error("unknown truncation rule '{0}'")]
    UnknownRule(String),
    #[error("trend '{0}' has no values for this zone")]
    MissingTrend(String),
    #[error("rule reads no trend named '{0}'")]
    UnknownTrend(String),
}

/// A probability vector that the core refuses to use.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbabilityError {
    #[error("expected {expected} facies probabilities, got {got}")]
    Length { expected: usize, got: usize },
    #[error("probability {value} for facies index {index} is outside [0,1]")]
    OutOfRange { index: usize, value: f64 },
    #[error("facies probabilities sum to {sum}, outside tolerance {tol} of 1")]
    NotNormalized { sum: f64, tol: f64 },
}

/// Errors from building maps and locating alpha coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TruncationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Probability(#[from] ProbabilityError),
    #[error("alpha coordinate has {got} components, rule needs {expected}")]
    AlphaDimension { expected: usize, got: usize },
    #[error("expected {expected} trend values, got {got}")]
    TrendLength { expected: usize, got: usize },
    #[error("no probabilities set; call set_probabilities first")]
    NotReady,
    /// Internal-consistency failure: the partition does not cover the point
    /// even after the nudge retry.
    #[error("point ({x}, {y}) is not covered by any polygon after retry")]
    Unassigned { x: f64, y: f64 },
    #[error("cell {cell} is out of range (zone has {cells} cells)")]
    CellOutOfRange { cell: usize, cells: usize },
}
