//! Zone-level driver: evaluate a truncation rule over whole fields of cells.
//!
//! Purpose
//! - Hold one configured `Rule`, the zone's `ProbabilityField` and per-cell
//!   trend values, and map every cell's alpha coordinate to a facies.
//!
//! Why this design
//! - Cells with the same probabilities and trend values as the previous cell
//!   reuse the current partition; otherwise the rule rebuilds (or fetches from
//!   its memo cache).
//! - `evaluate_par` splits cells into chunks over rayon workers; each worker
//!   owns a clone of the rule (and so its own memo cache) and the per-worker
//!   diagnostics are summed into the run report. Output order and values match
//!   `evaluate` exactly.

mod field;
mod sample;

use std::ops::Range;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ProbabilityError, TruncationError};
use crate::facies::probability::rescale_probabilities;
use crate::rules::{Diagnostics, FaciesPolygon, Located, Rule, TruncationRule};

pub use field::{AlphaField, FaciesProbability, ProbabilityField};
pub use sample::{estimate_frequencies, FrequencyEstimate};

/// Engine settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineCfg {
    /// Per-cell sums further than this from 1 count as a normalization
    /// correction. Every cell is rescaled to unit sum regardless.
    pub normalize_tol: f64,
    /// Cells per rayon task in `evaluate_par`.
    pub chunk_size: usize,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            normalize_tol: 1e-3,
            chunk_size: 4096,
        }
    }
}

/// Summary of the last evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub cells: usize,
    /// Cells whose probabilities were rescaled beyond `normalize_tol`.
    pub normalization_corrections: u64,
    pub diagnostics: Diagnostics,
}

pub struct TruncationEngine {
    rule: Rule,
    probs: ProbabilityField,
    trend_names: Vec<String>,
    trends: Vec<Option<Vec<f64>>>,
    cfg: EngineCfg,
    report: RunReport,
}

impl TruncationEngine {
    pub fn new(
        rule: Rule,
        probs: ProbabilityField,
        cfg: EngineCfg,
    ) -> Result<Self, TruncationError> {
        let expected = rule.catalog().len();
        if probs.len() != expected {
            return Err(ProbabilityError::Length {
                expected,
                got: probs.len(),
            }
            .into());
        }
        let trend_names = rule.trend_names();
        let trends = vec![None; trend_names.len()];
        Ok(Self {
            rule,
            probs,
            trend_names,
            trends,
            cfg,
            report: RunReport::default(),
        })
    }

    /// Attach per-cell values for the trend `name` the rule reads.
    pub fn with_trend(mut self, name: &str, values: Vec<f64>) -> Result<Self, TruncationError> {
        let k = self
            .trend_names
            .iter()
            .position(|t| t == name)
            .ok_or_else(|| ConfigError::UnknownTrend(name.to_string()))?;
        if let Some(n) = self.probs.cells() {
            if values.len() != n {
                return Err(TruncationError::TrendLength {
                    expected: n,
                    got: values.len(),
                });
            }
        }
        self.trends[k] = Some(values);
        Ok(self)
    }

    #[inline]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    #[inline]
    pub fn cfg(&self) -> EngineCfg {
        self.cfg
    }

    /// Report of the last `evaluate`/`evaluate_par` run.
    #[inline]
    pub fn report(&self) -> RunReport {
        self.report
    }

    /// Facies of every cell, sequentially.
    pub fn evaluate(&mut self, alpha: &AlphaField) -> Result<Vec<Located>, TruncationError> {
        let cells = self.check_alpha(alpha)?;
        let trends = trend_columns(&self.trends, &self.trend_names)?;
        self.rule.reset_diagnostics();
        let inputs = CellInputs {
            probs: &self.probs,
            trends: &trends,
            normalize_tol: self.cfg.normalize_tol,
        };
        let (out, corrections) = inputs.evaluate(&mut self.rule, alpha, 0..cells)?;
        self.finish(cells, corrections, self.rule.diagnostics());
        Ok(out)
    }

    /// Facies of every cell, in parallel chunks. Same result as `evaluate`.
    pub fn evaluate_par(&mut self, alpha: &AlphaField) -> Result<Vec<Located>, TruncationError> {
        let cells = self.check_alpha(alpha)?;
        let trends = trend_columns(&self.trends, &self.trend_names)?;
        let chunk = self.cfg.chunk_size.max(1);
        let inputs = CellInputs {
            probs: &self.probs,
            trends: &trends,
            normalize_tol: self.cfg.normalize_tol,
        };
        let rule = &self.rule;
        let starts: Vec<usize> = (0..cells).step_by(chunk).collect();
        debug!(cells, chunks = starts.len(), "parallel evaluation");
        let parts = starts
            .into_par_iter()
            .map_init(
                || {
                    let worker = rule.clone();
                    worker.reset_diagnostics();
                    worker
                },
                |worker, start| -> Result<_, TruncationError> {
                    let range = start..(start + chunk).min(cells);
                    let (out, corrections) = inputs.evaluate(worker, alpha, range)?;
                    let diag = worker.diagnostics();
                    worker.reset_diagnostics();
                    Ok((out, corrections, diag))
                },
            )
            .collect::<Result<Vec<_>, TruncationError>>()?;

        let mut out = Vec::with_capacity(cells);
        let mut corrections = 0;
        let mut diag = Diagnostics::default();
        for (part, c, d) in parts {
            out.extend(part);
            corrections += c;
            diag += d;
        }
        self.finish(cells, corrections, diag);
        Ok(out)
    }

    /// Partition the rule builds for `cell`.
    pub fn polygons_for_cell(
        &mut self,
        cell: usize,
    ) -> Result<Vec<FaciesPolygon>, TruncationError> {
        let trends = trend_columns(&self.trends, &self.trend_names)?;
        let field_cells = self
            .probs
            .cells()
            .or_else(|| trends.first().map(|t| t.len()));
        if let Some(n) = field_cells {
            if cell >= n {
                return Err(TruncationError::CellOutOfRange { cell, cells: n });
            }
        }
        let inputs = CellInputs {
            probs: &self.probs,
            trends: &trends,
            normalize_tol: self.cfg.normalize_tol,
        };
        let mut p = vec![0.0; self.probs.len()];
        let mut t = vec![0.0; trends.len()];
        inputs.fill(cell, &mut p, &mut t);
        self.rule.set_trend_values(&t)?;
        self.rule.set_probabilities(&p)?;
        self.rule.current_polygons()
    }

    fn check_alpha(&self, alpha: &AlphaField) -> Result<usize, TruncationError> {
        let dims = self.rule.alpha_dims();
        if alpha.dims() < dims {
            return Err(TruncationError::AlphaDimension {
                expected: dims,
                got: alpha.dims(),
            });
        }
        let cells = alpha.cells();
        let field_cells = self
            .probs
            .cells()
            .into_iter()
            .chain(self.trends.iter().flatten().map(Vec::len));
        for n in field_cells {
            if n < cells {
                return Err(TruncationError::CellOutOfRange {
                    cell: cells - 1,
                    cells: n,
                });
            }
        }
        Ok(cells)
    }

    fn finish(&mut self, cells: usize, corrections: u64, diagnostics: Diagnostics) {
        self.report = RunReport {
            cells,
            normalization_corrections: corrections,
            diagnostics,
        };
        if corrections > 0 {
            warn!(
                corrections,
                tol = self.cfg.normalize_tol,
                "rescaled cell probabilities that did not sum to 1"
            );
        }
        info!(
            kind = %self.rule.kind(),
            cells,
            rebuilds = diagnostics.rebuilds,
            cache_hits = diagnostics.cache_hits,
            boundary_retries = diagnostics.boundary_retries,
            nonconvergent_splits = diagnostics.nonconvergent_splits,
            "truncation run finished"
        );
    }
}

/// Value columns of every trend the rule reads, in rule order.
fn trend_columns<'a>(
    trends: &'a [Option<Vec<f64>>],
    names: &[String],
) -> Result<Vec<&'a [f64]>, TruncationError> {
    trends
        .iter()
        .zip(names)
        .map(|(values, name)| {
            values
                .as_deref()
                .ok_or_else(|| ConfigError::MissingTrend(name.clone()).into())
        })
        .collect()
}

/// Read-only per-cell inputs shared by the sequential and parallel paths.
#[derive(Clone, Copy)]
struct CellInputs<'a> {
    probs: &'a ProbabilityField,
    trends: &'a [&'a [f64]],
    normalize_tol: f64,
}

impl CellInputs<'_> {
    /// Probabilities and trend values of `cell`; true when the probabilities
    /// needed a correction.
    fn fill(&self, cell: usize, p: &mut [f64], t: &mut [f64]) -> bool {
        self.probs.fill_cell(cell, p);
        for (v, column) in t.iter_mut().zip(self.trends) {
            *v = column[cell];
        }
        rescale_probabilities(p, self.normalize_tol)
    }

    fn evaluate(
        &self,
        rule: &mut Rule,
        alpha: &AlphaField,
        range: Range<usize>,
    ) -> Result<(Vec<Located>, u64), TruncationError> {
        let mut out = Vec::with_capacity(range.len());
        let mut corrections = 0;
        let mut p = vec![0.0; self.probs.len()];
        let mut t = vec![0.0; self.trends.len()];
        let mut last: Option<(Vec<f64>, Vec<f64>)> = None;
        for cell in range {
            if self.fill(cell, &mut p, &mut t) {
                corrections += 1;
            }
            let unchanged = last.as_ref().is_some_and(|(lp, lt)| *lp == p && *lt == t);
            if !unchanged {
                rule.set_trend_values(&t)?;
                rule.set_probabilities(&p)?;
                last = Some((p.clone(), t.clone()));
            }
            out.push(rule.locate(alpha.cell(cell))?);
        }
        Ok((out, corrections))
    }
}
