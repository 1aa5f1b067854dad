//! Per-rule diagnostic counters.
//!
//! Counters are atomics so `locate` can stay `&self` on the hot path and a
//! rule can be shared read-only across threads.

use std::ops::{Add, AddAssign};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Snapshot of the counters of one rule (or a sum over workers).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Lookups that missed every polygon and succeeded after the nudge.
    pub boundary_retries: u64,
    /// Calibrated splits whose area error stayed above the warning tolerance.
    pub nonconvergent_splits: u64,
    pub cache_hits: u64,
    /// Partitions built from scratch (cache misses or uncached updates).
    pub rebuilds: u64,
}

impl Add for Diagnostics {
    type Output = Diagnostics;
    fn add(self, rhs: Diagnostics) -> Diagnostics {
        Diagnostics {
            boundary_retries: self.boundary_retries + rhs.boundary_retries,
            nonconvergent_splits: self.nonconvergent_splits + rhs.nonconvergent_splits,
            cache_hits: self.cache_hits + rhs.cache_hits,
            rebuilds: self.rebuilds + rhs.rebuilds,
        }
    }
}

impl AddAssign for Diagnostics {
    fn add_assign(&mut self, rhs: Diagnostics) {
        *self = *self + rhs;
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    boundary_retries: AtomicU64,
    nonconvergent_splits: AtomicU64,
    cache_hits: AtomicU64,
    rebuilds: AtomicU64,
}

impl Counters {
    #[inline]
    pub(crate) fn boundary_retry(&self) {
        self.boundary_retries.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub(crate) fn nonconvergent_split(&self) {
        self.nonconvergent_splits.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub(crate) fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub(crate) fn rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Diagnostics {
        Diagnostics {
            boundary_retries: self.boundary_retries.load(Ordering::Relaxed),
            nonconvergent_splits: self.nonconvergent_splits.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            rebuilds: self.rebuilds.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.boundary_retries.store(0, Ordering::Relaxed);
        self.nonconvergent_splits.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.rebuilds.store(0, Ordering::Relaxed);
    }
}

impl Clone for Counters {
    fn clone(&self) -> Self {
        let d = self.snapshot();
        Self {
            boundary_retries: AtomicU64::new(d.boundary_retries),
            nonconvergent_splits: AtomicU64::new(d.nonconvergent_splits),
            cache_hits: AtomicU64::new(d.cache_hits),
            rebuilds: AtomicU64::new(d.rebuilds),
        }
    }
}
