//! Memoization of partitions by rounded probability vector.
//!
//! Many cells share nearly the same probabilities. Rounding each probability to
//! a multiple of `1/resolution` groups them under one key, and the partition is
//! built once per key from the rounded (renormalized) vector. Exact per-cell
//! rule parameters (trend angles, slant) are part of the key unrounded.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::diag::Counters;
use super::map::determined_facies;

/// Memo cache settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoCfg {
    /// Probabilities are rounded to multiples of `1/resolution`.
    pub resolution: u32,
    /// The cache is cleared when it grows past this many entries.
    pub max_entries: usize,
}

impl Default for MemoCfg {
    fn default() -> Self {
        Self {
            resolution: 100,
            max_entries: 100_000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MemoKey {
    probs: Vec<u32>,
    params: Vec<u64>,
}

/// Cache of built partitions of type `M`.
///
/// Owned by one rule instance; workers that evaluate cells in parallel each
/// hold their own clone, so no locking is needed.
#[derive(Debug)]
pub struct MemoCache<M> {
    cfg: MemoCfg,
    entries: HashMap<MemoKey, Arc<M>>,
}

impl<M> Clone for MemoCache<M> {
    fn clone(&self) -> Self {
        Self {
            cfg: self.cfg,
            entries: self.entries.clone(),
        }
    }
}

impl<M> MemoCache<M> {
    pub fn new(cfg: MemoCfg) -> Self {
        Self {
            cfg: MemoCfg {
                resolution: cfg.resolution.max(1),
                ..cfg
            },
            entries: HashMap::new(),
        }
    }

    #[inline]
    pub fn cfg(&self) -> MemoCfg {
        self.cfg
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Rounded integer key and the probability vector the partition is built
    /// from. A positive probability keeps at least one grid unit, so no facies
    /// vanishes from the rounded vector. The rounded vector is renormalized
    /// only when rounding moved its sum, so inputs already on the grid pass
    /// through unchanged.
    pub fn quantize(&self, probs: &[f64]) -> (Vec<u32>, Vec<f64>) {
        let res = f64::from(self.cfg.resolution);
        let ints: Vec<u32> = probs
            .iter()
            .map(|&p| {
                let k = (p.max(0.0) * res).round() as u32;
                if k == 0 && p > 0.0 {
                    1
                } else {
                    k
                }
            })
            .collect();
        let mut rounded: Vec<f64> = ints.iter().map(|&k| f64::from(k) / res).collect();
        let sum: f64 = rounded.iter().sum();
        if sum <= 0.0 {
            // Resolution too coarse for this vector; keep it exact.
            return (ints, probs.to_vec());
        }
        if (sum - 1.0).abs() > 1e-9 {
            rounded.iter_mut().for_each(|p| *p /= sum);
        }
        (ints, rounded)
    }

    /// Fetch the partition for `probs` + `params`, building it with `build`
    /// from the rounded vector on a miss.
    pub fn get_or_build<E>(
        &mut self,
        probs: &[f64],
        params: &[f64],
        counters: &Counters,
        build: impl FnOnce(&[f64]) -> Result<M, E>,
    ) -> Result<Arc<M>, E> {
        let (ints, rounded) = self.quantize(probs);
        let key = MemoKey {
            probs: ints,
            params: params.iter().map(|v| v.to_bits()).collect(),
        };
        if let Some(hit) = self.entries.get(&key) {
            counters.cache_hit();
            trace!(entries = self.entries.len(), "memo hit");
            return Ok(Arc::clone(hit));
        }
        counters.rebuild();
        let built = Arc::new(build(&rounded)?);
        if self.entries.len() >= self.cfg.max_entries {
            debug!(entries = self.entries.len(), "memo cache full; clearing");
            self.entries.clear();
        }
        self.entries.insert(key, Arc::clone(&built));
        Ok(built)
    }
}

/// Partition for `probs`: through `memo` when memoization is on, otherwise
/// built directly from the exact vector.
///
/// Whether a facies is determined is decided on the exact vector. Determined
/// maps bypass the cache, and `build` is handed `None` for every rounded
/// vector, so rounding never turns a cell into a single-facies cell.
pub(crate) fn fetch_or_build<M>(
    memo: Option<&mut MemoCache<M>>,
    probs: &[f64],
    params: &[f64],
    determined_eps: f64,
    counters: &Counters,
    build: impl FnOnce(&[f64], Option<usize>) -> M,
) -> Arc<M> {
    let determined = determined_facies(probs, determined_eps);
    match memo {
        Some(cache) if determined.is_none() => {
            let built = cache.get_or_build::<Infallible>(probs, params, counters, |q| {
                Ok(build(q, None))
            });
            match built {
                Ok(map) => map,
                Err(never) => match never {},
            }
        }
        _ => {
            counters.rebuild();
            Arc::new(build(probs, determined))
        }
    }
}
