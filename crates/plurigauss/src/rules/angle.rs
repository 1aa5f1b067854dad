//! Angle rule: the unit square is cut into facies polygons by a sequence of
//! straight boundary lines, each given by its angle.
//!
//! Slots are processed in order. Each slot's line sweeps from a reference
//! corner of the square (chosen by the quadrant of the line normal) across the
//! polygon still unassigned; bisection places it so the swept part has the
//! facies's target area times the slot's fraction. The last slot takes what is
//! left.

use std::sync::Arc;

use nalgebra::Vector2;

use crate::error::{ConfigError, TruncationError};
use crate::facies::{validate_probabilities, FaciesCatalog, OverlayModel};
use crate::geom2::{calibrate_split, Point, Polygon};

use super::diag::Counters;
use super::map::{MapSlot, TruncationMap};
use super::memo::{fetch_or_build, MemoCache};
use super::spec::{resolve_slots, AngleSpec, ParamSource, Slot};
use super::{
    check_alpha, map_polygons, Diagnostics, FaciesPolygon, Located, RuleCfg, RuleKind,
    TruncationRule,
};

/// Slot targets below this area get an empty polygon.
const MIN_SLOT_AREA: f64 = 1e-12;

#[derive(Clone, Debug)]
pub struct AngleRule {
    catalog: FaciesCatalog,
    slots: Vec<Slot>,
    sources: Vec<ParamSource>,
    trends: Vec<String>,
    overlay: OverlayModel,
    cfg: RuleCfg,
    angles: Vec<f64>,
    map: Option<Arc<TruncationMap>>,
    memo: Option<MemoCache<TruncationMap>>,
    counters: Counters,
}

impl AngleRule {
    pub fn new(
        spec: &AngleSpec,
        catalog: &FaciesCatalog,
        cfg: RuleCfg,
    ) -> Result<Self, ConfigError> {
        let entries: Vec<(&str, f64)> = spec
            .polygons
            .iter()
            .map(|p| (p.facies.as_str(), p.fraction))
            .collect();
        let (slots, overlay) = resolve_slots(&entries, &spec.overlay, catalog)?;
        let sources: Vec<ParamSource> = spec.polygons.iter().map(|p| p.angle.clone()).collect();
        for src in &sources {
            if let ParamSource::Constant(a) = src {
                if !a.is_finite() {
                    return Err(ConfigError::ParameterOutOfRange {
                        name: "angle".into(),
                        value: *a,
                    });
                }
            }
        }
        let mut trends: Vec<String> = Vec::new();
        for name in sources.iter().filter_map(ParamSource::trend) {
            if !trends.iter().any(|t| t == name) {
                trends.push(name.to_string());
            }
        }
        let angles = sources.iter().map(ParamSource::initial).collect();
        Ok(Self {
            catalog: catalog.clone(),
            slots,
            sources,
            trends,
            overlay,
            cfg,
            angles,
            map: None,
            memo: cfg.memo.map(MemoCache::new),
            counters: Counters::default(),
        })
    }

    /// Current partition, if probabilities were set.
    pub fn map(&self) -> Option<&TruncationMap> {
        self.map.as_deref()
    }

    pub fn overlay(&self) -> &OverlayModel {
        &self.overlay
    }
}

impl TruncationRule for AngleRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Angle
    }

    fn catalog(&self) -> &FaciesCatalog {
        &self.catalog
    }

    fn alpha_dims(&self) -> usize {
        2 + self.overlay.len()
    }

    fn trend_names(&self) -> Vec<String> {
        self.trends.clone()
    }

    fn set_trend_values(&mut self, values: &[f64]) -> Result<(), TruncationError> {
        if values.len() != self.trends.len() {
            return Err(TruncationError::TrendLength {
                expected: self.trends.len(),
                got: values.len(),
            });
        }
        for (angle, src) in self.angles.iter_mut().zip(&self.sources) {
            if let Some(name) = src.trend() {
                let k = self.trends.iter().position(|t| t == name).unwrap_or(0);
                *angle = values[k];
            }
        }
        Ok(())
    }

    fn set_probabilities(&mut self, probs: &[f64]) -> Result<(), TruncationError> {
        validate_probabilities(probs, self.catalog.len(), self.cfg.sum_tol)?;
        let map = fetch_or_build(
            self.memo.as_mut(),
            probs,
            &self.angles,
            self.cfg.determined_eps,
            &self.counters,
            |q, determined| match determined {
                Some(f) => TruncationMap::determined(f, self.slots.iter().map(|s| s.facies)),
                None => build_angle_map(
                    &self.slots,
                    &self.angles,
                    &self.overlay,
                    &self.cfg,
                    &self.counters,
                    q,
                ),
            },
        );
        self.map = Some(map);
        Ok(())
    }

    fn locate(&self, alpha: &[f64]) -> Result<Located, TruncationError> {
        check_alpha(alpha, self.alpha_dims())?;
        let map = self.map.as_deref().ok_or(TruncationError::NotReady)?;
        let index = map.locate(alpha, &self.overlay, self.cfg.nudge, &self.counters)?;
        Ok(Located {
            code: self.catalog.code(index),
            index,
        })
    }

    fn current_polygons(&self) -> Result<Vec<FaciesPolygon>, TruncationError> {
        let map = self.map.as_deref().ok_or(TruncationError::NotReady)?;
        Ok(map_polygons(map, &self.catalog))
    }

    fn diagnostics(&self) -> Diagnostics {
        self.counters.snapshot()
    }

    fn reset_diagnostics(&self) {
        self.counters.reset()
    }
}

/// Unit normal of the boundary line at `angle_deg` and the unit-square corner
/// the sweep starts from.
///
/// The line direction is `(cos a, sin a)`; the normal is its left normal. The
/// corner minimizes the projection onto the normal, so the near-side area grows
/// from zero as the line moves along the normal.
pub(crate) fn boundary_line(angle_deg: f64) -> (Point, Point) {
    let a = angle_deg.to_radians();
    let n = Vector2::new(-a.sin(), a.cos());
    let x = if n.x >= 0.0 { 0.0 } else { 1.0 };
    let y = if n.y >= 0.0 { 0.0 } else { 1.0 };
    (n, Vector2::new(x, y))
}

fn build_angle_map(
    slots: &[Slot],
    angles: &[f64],
    overlay: &OverlayModel,
    cfg: &RuleCfg,
    counters: &Counters,
    probs: &[f64],
) -> TruncationMap {
    let state = (!overlay.is_empty()).then(|| overlay.apply(probs));
    let areas = state.as_ref().map_or(probs, |s| s.areas.as_slice());

    let mut remaining = Polygon::unit_square();
    let mut out = Vec::with_capacity(slots.len());
    let last = slots.len() - 1;
    for (i, slot) in slots.iter().enumerate() {
        if i == last {
            out.push(MapSlot {
                polygon: std::mem::take(&mut remaining),
                facies: slot.facies,
            });
            break;
        }
        let target = areas[slot.facies] * slot.fraction;
        if target <= MIN_SLOT_AREA || remaining.is_degenerate() {
            out.push(MapSlot {
                polygon: Polygon::empty(),
                facies: slot.facies,
            });
            continue;
        }
        let (n, corner) = boundary_line(angles[i]);
        let split = calibrate_split(&remaining, n, corner, target, &cfg.calibration);
        if !split.converged {
            counters.nonconvergent_split();
        }
        out.push(MapSlot {
            polygon: split.near,
            facies: slot.facies,
        });
        remaining = split.far;
    }
    TruncationMap {
        slots: out,
        determined: None,
        overlay: state,
    }
}
