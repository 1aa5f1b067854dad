//! Bayfill rule: five facies of a bay-fill system arranged in closed form.
//!
//! Geometry in the (alpha1, alpha2) square:
//! - Floodplain (FP) lies above a slanted shoreline `y = b + sf·x`.
//! - Subbay (SB) is a band below it, down to a second shoreline; the `ysf`
//!   share of SB moves into a strip on the right edge of the lower bay.
//! - Lagoon (LG) takes the left part of the lower bay.
//! - The mouth between lagoon and strip holds wave-influenced bayfill (WBF)
//!   and the bayhead delta (BHD). BHD shares a region of the mouth with WBF
//!   and is separated from it by the third alpha coordinate.
//!
//! All boundaries are placed by exact area formulas; no bisection is needed.

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use nalgebra::Vector2;

use crate::error::{ConfigError, TruncationError};
use crate::facies::{validate_probabilities, FaciesCatalog};
use crate::geom2::{clip_halfplane, Point, Polygon};

use super::diag::Counters;
use super::map::{MapSlot, TruncationMap};
use super::memo::{fetch_or_build, MemoCache};
use super::spec::{BayfillSpec, ParamSource};
use super::{
    check_alpha, map_polygons, Diagnostics, FaciesPolygon, Located, RuleCfg, RuleKind,
    TruncationRule,
};

/// Slant factors below this are treated as a flat shoreline.
const FLAT_SLANT: f64 = 1e-12;
/// `sbhd` at or above `1 − SBHD_FULL_EPS` makes the wedge the whole mouth.
const SBHD_FULL_EPS: f64 = 1e-9;

const FLOODPLAIN_SLOT: usize = 0;
const SUBBAY_BAND_SLOT: usize = 1;
const SUBBAY_STRIP_SLOT: usize = 2;
const LAGOON_SLOT: usize = 3;
const WBF_SLOT: usize = 4;
const SHARED_SLOT: usize = 5;

/// Region of the bayfill partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BayfillRegion {
    Floodplain,
    SubbayBand,
    SubbayStrip,
    Lagoon,
    /// Part of the mouth that is WBF for every third coordinate.
    WaveInfluenced,
    /// Part of the mouth split between BHD (`z ≤ Zm`) and WBF.
    Shared,
}

impl BayfillRegion {
    fn from_slot(slot: usize) -> Option<Self> {
        Some(match slot {
            FLOODPLAIN_SLOT => BayfillRegion::Floodplain,
            SUBBAY_BAND_SLOT => BayfillRegion::SubbayBand,
            SUBBAY_STRIP_SLOT => BayfillRegion::SubbayStrip,
            LAGOON_SLOT => BayfillRegion::Lagoon,
            WBF_SLOT => BayfillRegion::WaveInfluenced,
            SHARED_SLOT => BayfillRegion::Shared,
            _ => return None,
        })
    }
}

/// Which piece of the square lies above a shoreline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShorelineCase {
    /// `sf = 0`: horizontal line.
    Flat,
    /// Triangle in the top-left corner.
    TopCorner,
    /// Line crosses both vertical edges.
    Band,
    /// Everything except a triangle in the bottom-right corner.
    BottomCorner,
}

/// How the bayhead delta fits into the mouth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouthCase {
    /// The wedge next to the subbay strip holds at least the BHD area.
    Wedge,
    /// The wedge is too small; BHD shares the whole mouth with WBF.
    FullMouth,
}

/// Intercept `b` of `y = b + k·x` such that the area of the unit square above
/// the line is `p`.
pub(crate) fn shoreline_level(p: f64, k: f64) -> (f64, ShorelineCase) {
    let p = p.clamp(0.0, 1.0);
    if k < FLAT_SLANT {
        return (1.0 - p, ShorelineCase::Flat);
    }
    if p <= 0.5 * k {
        (1.0 - (2.0 * k * p).sqrt(), ShorelineCase::TopCorner)
    } else if p >= 1.0 - 0.5 * k {
        ((2.0 * k * (1.0 - p)).sqrt() - k, ShorelineCase::BottomCorner)
    } else {
        (1.0 - p - 0.5 * k, ShorelineCase::Band)
    }
}

/// Area of the region below `y = b + k·x` left of `x`, and its inverse.
///
/// Column height is `clamp(b + k·t, 0, 1)`: zero before `a0`, linear on
/// `[a0, a1]`, full after `a1`.
#[derive(Clone, Copy, Debug)]
struct Column {
    k: f64,
    a0: f64,
    a1: f64,
    /// Height at `a0`.
    h0: f64,
    /// Area left of `a1`.
    ramp: f64,
}

impl Column {
    fn new(b: f64, k: f64) -> Self {
        if k < FLAT_SLANT {
            let h = b.clamp(0.0, 1.0);
            return Self {
                k: 0.0,
                a0: 0.0,
                a1: 1.0,
                h0: h,
                ramp: h,
            };
        }
        let a0 = (-b / k).clamp(0.0, 1.0);
        let a1 = ((1.0 - b) / k).clamp(0.0, 1.0);
        let h0 = (b + k * a0).clamp(0.0, 1.0);
        let w = a1 - a0;
        Self {
            k,
            a0,
            a1,
            h0,
            ramp: w * (h0 + 0.5 * k * w),
        }
    }

    fn area(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        if x <= self.a0 {
            0.0
        } else if x <= self.a1 {
            let w = x - self.a0;
            w * (self.h0 + 0.5 * self.k * w)
        } else {
            self.ramp + (x - self.a1)
        }
    }

    /// Smallest `x` with `area(x) = t`.
    fn inverse(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return self.a0;
        }
        let x = if t <= self.ramp {
            // Root of k/2·w² + h0·w = t in the cancellation-free form.
            let denom = self.h0 + (self.h0 * self.h0 + 2.0 * self.k * t).sqrt();
            if denom <= 0.0 {
                self.a0
            } else {
                self.a0 + 2.0 * t / denom
            }
        } else {
            self.a1 + (t - self.ramp)
        };
        x.clamp(0.0, 1.0)
    }
}

/// Partition built for one probability vector and slant factor.
#[derive(Clone, Debug, PartialEq)]
pub struct BayfillMap {
    /// Slots in order FP, SB band, SB strip, LG, WBF, shared (tagged BHD).
    pub map: TruncationMap,
    /// BHD threshold on the third coordinate inside the shared region.
    pub zm: f64,
    /// Cases of the floodplain and subbay shorelines; `None` when determined.
    pub shorelines: Option<(ShorelineCase, ShorelineCase)>,
    pub mouth: Option<MouthCase>,
    /// Right edge of the lagoon.
    pub lagoon_x: f64,
    /// Left edge of the subbay strip.
    pub strip_x: f64,
}

impl BayfillMap {
    /// Region containing `p`, without the boundary retry.
    pub fn region_at(&self, p: Point) -> Option<BayfillRegion> {
        self.map.find_slot(p).and_then(BayfillRegion::from_slot)
    }

    pub fn region_polygon(&self, region: BayfillRegion) -> &Polygon {
        let slot = match region {
            BayfillRegion::Floodplain => FLOODPLAIN_SLOT,
            BayfillRegion::SubbayBand => SUBBAY_BAND_SLOT,
            BayfillRegion::SubbayStrip => SUBBAY_STRIP_SLOT,
            BayfillRegion::Lagoon => LAGOON_SLOT,
            BayfillRegion::WaveInfluenced => WBF_SLOT,
            BayfillRegion::Shared => SHARED_SLOT,
        };
        &self.map.slots[slot].polygon
    }
}

/// Zone facies indices of the five roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Roles {
    fp: usize,
    sb: usize,
    wbf: usize,
    bhd: usize,
    lg: usize,
}

impl Roles {
    fn slot_facies(&self) -> [usize; 6] {
        [self.fp, self.sb, self.sb, self.lg, self.wbf, self.bhd]
    }
}

#[derive(Clone, Debug)]
pub struct BayfillRule {
    catalog: FaciesCatalog,
    roles: Roles,
    sf_source: ParamSource,
    sf: f64,
    ysf: f64,
    sbhd: f64,
    cfg: RuleCfg,
    map: Option<Arc<BayfillMap>>,
    memo: Option<MemoCache<BayfillMap>>,
    counters: Counters,
}

fn unit_param(name: &str, value: f64) -> Result<f64, ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::ParameterOutOfRange {
            name: name.to_string(),
            value,
        })
    }
}

impl BayfillRule {
    pub fn new(
        spec: &BayfillSpec,
        catalog: &FaciesCatalog,
        cfg: RuleCfg,
    ) -> Result<Self, ConfigError> {
        let names = [
            spec.floodplain.clone(),
            spec.subbay.clone(),
            spec.wave_influenced.clone(),
            spec.bayhead_delta.clone(),
            spec.lagoon.clone(),
        ];
        let ordering = catalog.ordering(&names)?;
        let roles = Roles {
            fp: ordering.zone_index(0),
            sb: ordering.zone_index(1),
            wbf: ordering.zone_index(2),
            bhd: ordering.zone_index(3),
            lg: ordering.zone_index(4),
        };
        let sf = match &spec.sf {
            ParamSource::Constant(v) => unit_param("sf", *v)?,
            ParamSource::Trend { .. } => 0.0,
        };
        Ok(Self {
            catalog: catalog.clone(),
            roles,
            sf_source: spec.sf.clone(),
            sf,
            ysf: unit_param("ysf", spec.ysf)?,
            sbhd: unit_param("sbhd", spec.sbhd)?,
            cfg,
            map: None,
            memo: cfg.memo.map(MemoCache::new),
            counters: Counters::default(),
        })
    }

    pub fn map(&self) -> Option<&BayfillMap> {
        self.map.as_deref()
    }

    /// Current slant factor.
    pub fn sf(&self) -> f64 {
        self.sf
    }

    /// BHD threshold of the current partition.
    pub fn z_threshold(&self) -> Option<f64> {
        self.map.as_deref().map(|m| m.zm)
    }
}

impl TruncationRule for BayfillRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Bayfill
    }

    fn catalog(&self) -> &FaciesCatalog {
        &self.catalog
    }

    fn alpha_dims(&self) -> usize {
        3
    }

    fn trend_names(&self) -> Vec<String> {
        self.sf_source.trend().map(str::to_string).into_iter().collect()
    }

    fn set_trend_values(&mut self, values: &[f64]) -> Result<(), TruncationError> {
        let expected = usize::from(self.sf_source.trend().is_some());
        if values.len() != expected {
            return Err(TruncationError::TrendLength {
                expected,
                got: values.len(),
            });
        }
        if let Some(&v) = values.first() {
            self.sf = unit_param("sf", v)?;
        }
        Ok(())
    }

    fn set_probabilities(&mut self, probs: &[f64]) -> Result<(), TruncationError> {
        validate_probabilities(probs, self.catalog.len(), self.cfg.sum_tol)?;
        let params = [self.sf];
        let eps = self.cfg.determined_eps;
        let (roles, sf, ysf, sbhd) = (self.roles, self.sf, self.ysf, self.sbhd);
        let build = |q: &[f64], determined: Option<usize>| match determined {
            Some(f) => determined_map(roles, f),
            None => build_bayfill_map(roles, sf, ysf, sbhd, q),
        };
        let map = fetch_or_build(self.memo.as_mut(), probs, &params, eps, &self.counters, build);
        self.map = Some(map);
        Ok(())
    }

    fn locate(&self, alpha: &[f64]) -> Result<Located, TruncationError> {
        check_alpha(alpha, 3)?;
        let map = self.map.as_deref().ok_or(TruncationError::NotReady)?;
        let index = match map.map.determined {
            Some(f) => f,
            None => {
                let p = Vector2::new(alpha[0], alpha[1]);
                let slot = map.map.locate_slot(p, self.cfg.nudge, &self.counters)?;
                if slot == SHARED_SLOT {
                    if map.zm > 0.0 && alpha[2] <= map.zm {
                        self.roles.bhd
                    } else {
                        self.roles.wbf
                    }
                } else {
                    map.map.slots[slot].facies
                }
            }
        };
        Ok(Located {
            code: self.catalog.code(index),
            index,
        })
    }

    fn current_polygons(&self) -> Result<Vec<FaciesPolygon>, TruncationError> {
        let map = self.map.as_deref().ok_or(TruncationError::NotReady)?;
        Ok(map_polygons(&map.map, &self.catalog))
    }

    fn diagnostics(&self) -> Diagnostics {
        self.counters.snapshot()
    }

    fn reset_diagnostics(&self) {
        self.counters.reset()
    }
}

fn nonempty(p: Polygon) -> Polygon {
    if p.is_degenerate() {
        Polygon::empty()
    } else {
        p
    }
}

fn determined_map(roles: Roles, f: usize) -> BayfillMap {
    BayfillMap {
        map: TruncationMap::determined(f, roles.slot_facies()),
        zm: if f == roles.bhd { 1.0 } else { 0.0 },
        shorelines: None,
        mouth: None,
        lagoon_x: 0.0,
        strip_x: 1.0,
    }
}

fn build_bayfill_map(roles: Roles, sf: f64, ysf: f64, sbhd: f64, probs: &[f64]) -> BayfillMap {
    let p_fp = probs[roles.fp];
    let p_sb = probs[roles.sb];
    let p_bhd = probs[roles.bhd].max(0.0);
    let p_lg = probs[roles.lg].max(0.0);

    let (b1, case1) = shoreline_level(p_fp, sf);
    let (b2, case2) = shoreline_level(p_fp + (1.0 - ysf) * p_sb, sf);
    let square = Polygon::unit_square();
    // Above y = b + sf·x  <=>  sf·x − y ≤ −b.
    let floodplain = clip_halfplane(&square, Vector2::new(sf, -1.0), -b1);
    let below_first = clip_halfplane(&square, Vector2::new(-sf, 1.0), b1);
    let band = clip_halfplane(&below_first, Vector2::new(sf, -1.0), -b2);
    let lower = clip_halfplane(&square, Vector2::new(-sf, 1.0), b2);

    let column = Column::new(b2, sf);
    let lower_area = column.area(1.0);
    let lagoon_x = column.inverse(p_lg);
    let strip_x = column
        .inverse(lower_area - ysf * p_sb.max(0.0))
        .max(lagoon_x);

    let lagoon = clip_halfplane(&lower, Vector2::new(1.0, 0.0), lagoon_x);
    let strip = clip_halfplane(&lower, Vector2::new(-1.0, 0.0), -strip_x);
    let mouth = clip_halfplane(
        &clip_halfplane(&lower, Vector2::new(-1.0, 0.0), -lagoon_x),
        Vector2::new(1.0, 0.0),
        strip_x,
    );

    let wedge = if sbhd >= 1.0 - SBHD_FULL_EPS {
        mouth.clone()
    } else {
        // y ≤ c·(xs − x)
        let c = (sbhd * FRAC_PI_2).tan();
        clip_halfplane(&mouth, Vector2::new(c, 1.0), c * strip_x)
    };
    let wedge_area = wedge.area();
    let (case, wbf, shared) = if wedge_area > 0.0 && wedge_area >= p_bhd {
        let c = (sbhd * FRAC_PI_2).tan();
        let rest = if sbhd >= 1.0 - SBHD_FULL_EPS {
            Polygon::empty()
        } else {
            clip_halfplane(&mouth, Vector2::new(-c, -1.0), -c * strip_x)
        };
        (MouthCase::Wedge, rest, wedge)
    } else {
        (MouthCase::FullMouth, Polygon::empty(), mouth)
    };
    let shared_area = shared.area();
    let zm = if shared_area > 0.0 {
        (p_bhd / shared_area).min(1.0)
    } else {
        0.0
    };

    let polygons = [floodplain, band, strip, lagoon, wbf, shared];
    let slots = polygons
        .into_iter()
        .zip(roles.slot_facies())
        .map(|(polygon, facies)| MapSlot {
            polygon: nonempty(polygon),
            facies,
        })
        .collect();
    BayfillMap {
        map: TruncationMap {
            slots,
            determined: None,
            overlay: None,
        },
        zm,
        shorelines: Some((case1, case2)),
        mouth: Some(case),
        lagoon_x,
        strip_x,
    }
}
