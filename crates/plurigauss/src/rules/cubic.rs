//! Cubic rule: nested axis-aligned rectangles.
//!
//! The tree's first level cuts the unit square along the configured axis,
//! each child level cuts its parent rectangle along the other axis. Every
//! node's extent is proportional to the summed target area of its leaves, so
//! a leaf rectangle has exactly its slot's target area.

use std::sync::Arc;

use crate::error::{ConfigError, TruncationError};
use crate::facies::{validate_probabilities, FaciesCatalog, OverlayModel};
use crate::geom2::Polygon;

use super::diag::Counters;
use super::map::{MapSlot, TruncationMap};
use super::memo::{fetch_or_build, MemoCache};
use super::spec::{resolve_slots, CubicAxis, CubicNodeSpec, CubicSpec, Slot};
use super::{
    check_alpha, map_polygons, Diagnostics, FaciesPolygon, Located, RuleCfg, RuleKind,
    TruncationRule,
};

/// Resolved tree node; leaves index into the slot list.
#[derive(Clone, Debug, PartialEq)]
enum Node {
    Leaf(usize),
    Group(Vec<Node>),
}

#[derive(Clone, Copy, Debug)]
struct Rect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Rect {
    const UNIT: Rect = Rect {
        x0: 0.0,
        y0: 0.0,
        x1: 1.0,
        y1: 1.0,
    };

    fn span(&self, axis: CubicAxis) -> (f64, f64) {
        match axis {
            CubicAxis::X => (self.x0, self.x1),
            CubicAxis::Y => (self.y0, self.y1),
        }
    }

    fn with_span(&self, axis: CubicAxis, lo: f64, hi: f64) -> Rect {
        match axis {
            CubicAxis::X => Rect { x0: lo, x1: hi, ..*self },
            CubicAxis::Y => Rect { y0: lo, y1: hi, ..*self },
        }
    }

    fn polygon(&self) -> Polygon {
        if self.x1 - self.x0 <= 0.0 || self.y1 - self.y0 <= 0.0 {
            Polygon::empty()
        } else {
            Polygon::rect(self.x0, self.y0, self.x1, self.y1)
        }
    }
}

#[derive(Clone, Debug)]
pub struct CubicRule {
    catalog: FaciesCatalog,
    axis: CubicAxis,
    root: Vec<Node>,
    slots: Vec<Slot>,
    overlay: OverlayModel,
    cfg: RuleCfg,
    map: Option<Arc<TruncationMap>>,
    memo: Option<MemoCache<TruncationMap>>,
    counters: Counters,
}

impl CubicRule {
    pub fn new(
        spec: &CubicSpec,
        catalog: &FaciesCatalog,
        cfg: RuleCfg,
    ) -> Result<Self, ConfigError> {
        let mut entries: Vec<(&str, f64)> = Vec::new();
        let root = spec
            .nodes
            .iter()
            .map(|n| resolve_node(n, &mut entries))
            .collect::<Result<Vec<_>, _>>()?;
        let (slots, overlay) = resolve_slots(&entries, &spec.overlay, catalog)?;
        Ok(Self {
            catalog: catalog.clone(),
            axis: spec.axis,
            root,
            slots,
            overlay,
            cfg,
            map: None,
            memo: cfg.memo.map(MemoCache::new),
            counters: Counters::default(),
        })
    }

    pub fn map(&self) -> Option<&TruncationMap> {
        self.map.as_deref()
    }

    pub fn overlay(&self) -> &OverlayModel {
        &self.overlay
    }
}

fn resolve_node<'a>(
    node: &'a CubicNodeSpec,
    entries: &mut Vec<(&'a str, f64)>,
) -> Result<Node, ConfigError> {
    match node {
        CubicNodeSpec::Leaf { facies, fraction } => {
            entries.push((facies.as_str(), *fraction));
            Ok(Node::Leaf(entries.len() - 1))
        }
        CubicNodeSpec::Group { split } => {
            if split.is_empty() {
                return Err(ConfigError::NoPolygons);
            }
            split
                .iter()
                .map(|n| resolve_node(n, entries))
                .collect::<Result<Vec<_>, _>>()
                .map(Node::Group)
        }
    }
}

impl TruncationRule for CubicRule {
    fn kind(&self) -> RuleKind {
        RuleKind::Cubic
    }

    fn catalog(&self) -> &FaciesCatalog {
        &self.catalog
    }

    fn alpha_dims(&self) -> usize {
        2 + self.overlay.len()
    }

    fn trend_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn set_trend_values(&mut self, values: &[f64]) -> Result<(), TruncationError> {
        if !values.is_empty() {
            return Err(TruncationError::TrendLength {
                expected: 0,
                got: values.len(),
            });
        }
        Ok(())
    }

    fn set_probabilities(&mut self, probs: &[f64]) -> Result<(), TruncationError> {
        validate_probabilities(probs, self.catalog.len(), self.cfg.sum_tol)?;
        let eps = self.cfg.determined_eps;
        let build = |q: &[f64], determined: Option<usize>| match determined {
            Some(f) => TruncationMap::determined(f, self.slots.iter().map(|s| s.facies)),
            None => build_cubic_map(&self.root, self.axis, &self.slots, &self.overlay, q),
        };
        let map = fetch_or_build(self.memo.as_mut(), probs, &[], eps, &self.counters, build);
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

fn build_cubic_map(
    root: &[Node],
    axis: CubicAxis,
    slots: &[Slot],
    overlay: &OverlayModel,
    probs: &[f64],
) -> TruncationMap {
    let state = (!overlay.is_empty()).then(|| overlay.apply(probs));
    let areas = state.as_ref().map_or(probs, |s| s.areas.as_slice());
    let targets: Vec<f64> = slots
        .iter()
        .map(|s| (areas[s.facies] * s.fraction).max(0.0))
        .collect();

    let mut polygons = vec![Polygon::empty(); slots.len()];
    layout(root, Rect::UNIT, axis, &targets, &mut polygons);
    TruncationMap {
        slots: polygons
            .into_iter()
            .zip(slots)
            .map(|(polygon, s)| MapSlot {
                polygon,
                facies: s.facies,
            })
            .collect(),
        determined: None,
        overlay: state,
    }
}

fn node_area(node: &Node, targets: &[f64]) -> f64 {
    match node {
        Node::Leaf(i) => targets[*i],
        Node::Group(children) => children.iter().map(|c| node_area(c, targets)).sum(),
    }
}

/// Cut `rect` along `axis` among `nodes`. The last node ends exactly at the
/// rectangle's end so rounding never leaves a gap.
fn layout(nodes: &[Node], rect: Rect, axis: CubicAxis, targets: &[f64], out: &mut [Polygon]) {
    let areas: Vec<f64> = nodes.iter().map(|n| node_area(n, targets)).collect();
    let total: f64 = areas.iter().sum();
    let (lo, hi) = rect.span(axis);
    let mut start = lo;
    for (k, (node, area)) in nodes.iter().zip(&areas).enumerate() {
        let end = if k + 1 == nodes.len() {
            hi
        } else if total > 0.0 {
            (start + (hi - lo) * area / total).min(hi)
        } else {
            start
        };
        let sub = rect.with_span(axis, start, end);
        match node {
            Node::Leaf(i) => out[*i] = sub.polygon(),
            Node::Group(children) => layout(children, sub, axis.flip(), targets, out),
        }
        start = end;
    }
}
