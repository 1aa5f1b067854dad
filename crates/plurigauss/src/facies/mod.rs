//! Facies catalog, overlay groups and probability vectors.
//!
//! - `FaciesCatalog`: the zone's ordered facies with their global codes.
//! - `FaciesOrdering`: rule position → zone position, validated as a bijection.
//! - `OverlayModel`: background rescaling and overlay truncation intervals.
//! - `probability`: validation and the normalization helper used by callers.

mod catalog;
mod overlay;
pub mod probability;

pub use catalog::{Facies, FaciesCatalog, FaciesOrdering};
pub use overlay::{OverlayGroup, OverlayInterval, OverlayModel, OverlayState, MIN_BACKGROUND_PROB};
pub use probability::{normalize_probabilities, validate_probabilities};
