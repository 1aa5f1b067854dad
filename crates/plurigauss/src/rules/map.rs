//! Computed partition of the unit square and the point lookup on it.

use nalgebra::Vector2;

use crate::error::TruncationError;
use crate::facies::{OverlayModel, OverlayState};
use crate::geom2::{Point, Polygon};

use super::diag::Counters;

/// One polygon of the partition and the zone facies it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct MapSlot {
    pub polygon: Polygon,
    pub facies: usize,
}

/// Partition built for one probability vector. Transient: rebuilt (or fetched
/// from the memo cache) whenever the probabilities or cell parameters change.
#[derive(Clone, Debug, PartialEq)]
pub struct TruncationMap {
    pub slots: Vec<MapSlot>,
    /// Facies with probability ≈ 1; lookups return it without geometry.
    pub determined: Option<usize>,
    pub overlay: Option<OverlayState>,
}

impl TruncationMap {
    /// Map for a determined facies: the first slot of `facies` covers the unit
    /// square, every other slot is empty.
    pub fn determined(facies: usize, slot_facies: impl IntoIterator<Item = usize>) -> Self {
        let mut claimed = false;
        let slots = slot_facies
            .into_iter()
            .map(|f| {
                let polygon = if f == facies && !claimed {
                    claimed = true;
                    Polygon::unit_square()
                } else {
                    Polygon::empty()
                };
                MapSlot { polygon, facies: f }
            })
            .collect();
        Self {
            slots,
            determined: Some(facies),
            overlay: None,
        }
    }

    /// Index of the first slot containing `p`.
    #[inline]
    pub fn find_slot(&self, p: Point) -> Option<usize> {
        self.slots.iter().position(|s| s.polygon.contains(p))
    }

    /// Slot lookup with one nudge retry for points that fall on a boundary no
    /// polygon claims.
    pub(crate) fn locate_slot(
        &self,
        p: Point,
        nudge: f64,
        counters: &Counters,
    ) -> Result<usize, TruncationError> {
        if let Some(i) = self.find_slot(p) {
            return Ok(i);
        }
        counters.boundary_retry();
        self.find_slot(nudge_point(p, nudge))
            .ok_or(TruncationError::Unassigned { x: p.x, y: p.y })
    }

    /// Zone facies index for `alpha`, applying overlay truncation.
    pub(crate) fn locate(
        &self,
        alpha: &[f64],
        overlay: &OverlayModel,
        nudge: f64,
        counters: &Counters,
    ) -> Result<usize, TruncationError> {
        if let Some(f) = self.determined {
            return Ok(f);
        }
        let p = Vector2::new(alpha[0], alpha[1]);
        let slot = self.locate_slot(p, nudge, counters)?;
        let base = self.slots[slot].facies;
        Ok(match &self.overlay {
            Some(state) => state.resolve(overlay, base, alpha),
            None => base,
        })
    }

    /// Summed polygon area of `facies`.
    pub fn facies_area(&self, facies: usize) -> f64 {
        self.slots
            .iter()
            .filter(|s| s.facies == facies)
            .map(|s| s.polygon.area())
            .sum()
    }

    pub fn total_area(&self) -> f64 {
        self.slots.iter().map(|s| s.polygon.area()).sum()
    }
}

/// Move each coordinate by `nudge` toward the square's center. Points on the
/// top or right edge (the sides the strict crossing test leaves unclaimed)
/// move away from 1.
#[inline]
pub(crate) fn nudge_point(p: Point, nudge: f64) -> Point {
    p.map(|c| if c > 0.5 { c - nudge } else { c + nudge })
}

/// Facies whose probability is at least `1 − eps`, if any.
pub(crate) fn determined_facies(probs: &[f64], eps: f64) -> Option<usize> {
    probs.iter().position(|&p| p >= 1.0 - eps)
}
