//! Overlay facies: a secondary facies truncated from an extra alpha dimension
//! on top of a group of background facies.
//!
//! For a group with background probability `Pbg` and overlay probability
//! `Pov`, background areas in the 2D partition are inflated by
//! `1/deltaH = (Pbg + Pov)/Pbg`; the overlay takes the interval of width
//! `1 − deltaH` in the group's own alpha dimension. A background hit becomes
//! the overlay facies when that coordinate falls in `(low, high]`.

use crate::error::ConfigError;

use super::catalog::FaciesCatalog;

/// Floor applied to each background probability so a group never collapses to
/// a zero-width region while its overlay still needs volume.
pub const MIN_BACKGROUND_PROB: f64 = 0.0005;

/// One overlay facies and the background facies it is truncated from.
/// Indices are zone facies indices.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayGroup {
    pub background: Vec<usize>,
    pub overlay: usize,
    pub center: f64,
}

/// Half-open alpha interval `(low, high]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlayInterval {
    pub low: f64,
    pub high: f64,
}

impl OverlayInterval {
    pub const EMPTY: Self = Self {
        low: 0.0,
        high: 0.0,
    };

    /// Interval of `width` centered at `center`, shifted (not clipped) to stay
    /// inside `[0,1]`.
    pub fn centered(center: f64, width: f64) -> Self {
        let w = width.clamp(0.0, 1.0);
        let low = center - 0.5 * w;
        let high = center + 0.5 * w;
        if low < 0.0 {
            Self { low: 0.0, high: w }
        } else if high > 1.0 {
            Self {
                low: 1.0 - w,
                high: 1.0,
            }
        } else {
            Self { low, high }
        }
    }

    #[inline]
    pub fn contains(&self, a: f64) -> bool {
        a > self.low && a <= self.high
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// Validated overlay groups of one rule.
#[derive(Clone, Debug, Default)]
pub struct OverlayModel {
    groups: Vec<OverlayGroup>,
    // zone facies index -> group owning it as background
    background_group: Vec<Option<usize>>,
    is_overlay: Vec<bool>,
}

/// Per-probability-vector overlay quantities.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayState {
    /// 2D target area per zone facies; zero for overlay facies.
    pub areas: Vec<f64>,
    /// One interval per group, in group order.
    pub intervals: Vec<OverlayInterval>,
}

impl OverlayModel {
    /// Check the group invariants against the zone catalog.
    ///
    /// Background sets must be non-empty and pairwise disjoint; an overlay
    /// facies may not be a background facies or the overlay of a second group.
    pub fn new(groups: Vec<OverlayGroup>, catalog: &FaciesCatalog) -> Result<Self, ConfigError> {
        let n = catalog.len();
        let mut background_group = vec![None; n];
        let mut is_overlay = vec![false; n];
        for (g, group) in groups.iter().enumerate() {
            let ov_name = catalog
                .get(group.overlay)
                .map(|f| f.name.clone())
                .ok_or_else(|| ConfigError::UnknownFacies(format!("#{}", group.overlay)))?;
            if group.background.is_empty() {
                return Err(ConfigError::EmptyOverlayGroup { overlay: ov_name });
            }
            if !(0.0..=1.0).contains(&group.center) {
                return Err(ConfigError::CenterOutOfRange {
                    overlay: ov_name,
                    center: group.center,
                });
            }
            if is_overlay[group.overlay] {
                return Err(ConfigError::OverlayConflict(ov_name));
            }
            is_overlay[group.overlay] = true;
            for &b in &group.background {
                if b >= n {
                    return Err(ConfigError::UnknownFacies(format!("#{b}")));
                }
                if background_group[b].is_some() {
                    return Err(ConfigError::BackgroundClaimed(catalog.name(b).to_string()));
                }
                background_group[b] = Some(g);
            }
        }
        for (i, &ov) in is_overlay.iter().enumerate() {
            if ov && background_group[i].is_some() {
                return Err(ConfigError::OverlayConflict(catalog.name(i).to_string()));
            }
        }
        Ok(Self {
            groups,
            background_group,
            is_overlay,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[inline]
    pub fn is_overlay(&self, facies: usize) -> bool {
        self.is_overlay.get(facies).copied().unwrap_or(false)
    }

    #[inline]
    pub fn group_of_background(&self, facies: usize) -> Option<usize> {
        self.background_group.get(facies).copied().flatten()
    }

    /// Rescale background areas and derive the truncation intervals.
    pub fn apply(&self, probs: &[f64]) -> OverlayState {
        let mut areas = probs.to_vec();
        for (i, a) in areas.iter_mut().enumerate() {
            if self.is_overlay(i) {
                *a = 0.0;
            }
        }
        let mut intervals = Vec::with_capacity(self.groups.len());
        let mut clamped = false;
        for group in &self.groups {
            let p_ov = probs[group.overlay].max(0.0);
            if p_ov <= 0.0 {
                intervals.push(OverlayInterval::EMPTY);
                continue;
            }
            let mut p_bg = 0.0;
            for &b in &group.background {
                if probs[b] < MIN_BACKGROUND_PROB {
                    clamped = true;
                }
                p_bg += probs[b].max(MIN_BACKGROUND_PROB);
            }
            let delta_h = p_bg / (p_bg + p_ov);
            for &b in &group.background {
                areas[b] = probs[b].max(MIN_BACKGROUND_PROB) / delta_h;
            }
            intervals.push(OverlayInterval::centered(group.center, 1.0 - delta_h));
        }
        if clamped {
            let total: f64 = areas.iter().sum();
            if total > 0.0 {
                areas.iter_mut().for_each(|a| *a /= total);
            }
        }
        OverlayState { areas, intervals }
    }
}

impl OverlayState {
    /// Replace a background facies by its overlay when the group's alpha
    /// coordinate (dimension `2 + g`) falls inside the interval.
    #[inline]
    pub fn resolve(&self, model: &OverlayModel, facies: usize, alpha: &[f64]) -> usize {
        match model.group_of_background(facies) {
            Some(g) if self.intervals[g].contains(alpha[2 + g]) => model.groups[g].overlay,
            _ => facies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> FaciesCatalog {
        FaciesCatalog::from_pairs([("A", 1), ("B", 2), ("C", 3), ("O1", 4), ("O2", 5)]).unwrap()
    }

    #[test]
    fn interval_shifts_at_edges() {
        let mid = OverlayInterval::centered(0.5, 0.2);
        assert!((mid.low - 0.4).abs() < 1e-12 && (mid.high - 0.6).abs() < 1e-12);
        let lo = OverlayInterval::centered(0.05, 0.3);
        assert_eq!(lo.low, 0.0);
        assert!((lo.high - 0.3).abs() < 1e-12);
        let hi = OverlayInterval::centered(1.0, 0.4);
        assert!((hi.low - 0.6).abs() < 1e-12);
        assert_eq!(hi.high, 1.0);
        assert!(hi.contains(1.0) && !hi.contains(0.6));
    }

    #[test]
    fn rescaling_preserves_probabilities() {
        let z = zone();
        let model = OverlayModel::new(
            vec![OverlayGroup {
                background: vec![0, 1],
                overlay: 3,
                center: 0.5,
            }],
            &z,
        )
        .unwrap();
        let probs = [0.3, 0.2, 0.3, 0.2, 0.0];
        let st = model.apply(&probs);
        // deltaH = 0.5 / 0.7
        let dh = 0.5 / 0.7;
        assert!((st.areas[0] - 0.3 / dh).abs() < 1e-12);
        assert!((st.areas[1] - 0.2 / dh).abs() < 1e-12);
        assert_eq!(st.areas[2], 0.3);
        assert_eq!(st.areas[3], 0.0);
        assert!((st.areas.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        let w = st.intervals[0].width();
        assert!((w - (1.0 - dh)).abs() < 1e-12);
        // Effective probabilities: background keeps p, overlay gets Pov.
        assert!((st.areas[0] * (1.0 - w) - 0.3).abs() < 1e-12);
        assert!(((st.areas[0] + st.areas[1]) * w - 0.2).abs() < 1e-12);
    }

    #[test]
    fn zero_overlay_probability_leaves_backgrounds() {
        let z = zone();
        let model = OverlayModel::new(
            vec![OverlayGroup {
                background: vec![2],
                overlay: 4,
                center: 0.1,
            }],
            &z,
        )
        .unwrap();
        let st = model.apply(&[0.2, 0.3, 0.5, 0.0, 0.0]);
        assert_eq!(st.areas, vec![0.2, 0.3, 0.5, 0.0, 0.0]);
        assert_eq!(st.intervals[0], OverlayInterval::EMPTY);
        assert_eq!(st.resolve(&model, 2, &[0.5, 0.5, 0.0]), 2);
    }

    #[test]
    fn resolve_uses_group_dimension() {
        let z = zone();
        let model = OverlayModel::new(
            vec![
                OverlayGroup {
                    background: vec![0],
                    overlay: 3,
                    center: 0.5,
                },
                OverlayGroup {
                    background: vec![1, 2],
                    overlay: 4,
                    center: 0.0,
                },
            ],
            &z,
        )
        .unwrap();
        let st = model.apply(&[0.25, 0.25, 0.25, 0.125, 0.125]);
        let alpha_in = [0.1, 0.1, 0.5, 0.01];
        assert_eq!(st.resolve(&model, 0, &alpha_in), 3);
        assert_eq!(st.resolve(&model, 1, &alpha_in), 4);
        let alpha_out = [0.1, 0.1, 0.99, 0.99];
        assert_eq!(st.resolve(&model, 0, &alpha_out), 0);
        assert_eq!(st.resolve(&model, 2, &alpha_out), 2);
    }

    #[test]
    fn invariants_are_enforced() {
        let z = zone();
        let g = |background: Vec<usize>, overlay: usize| OverlayGroup {
            background,
            overlay,
            center: 0.5,
        };
        assert!(matches!(
            OverlayModel::new(vec![g(vec![], 3)], &z),
            Err(ConfigError::EmptyOverlayGroup { .. })
        ));
        assert_eq!(
            OverlayModel::new(vec![g(vec![0, 1], 3), g(vec![1], 4)], &z).unwrap_err(),
            ConfigError::BackgroundClaimed("B".into())
        );
        assert_eq!(
            OverlayModel::new(vec![g(vec![0], 3), g(vec![3], 4)], &z).unwrap_err(),
            ConfigError::OverlayConflict("O1".into())
        );
        assert!(matches!(
            OverlayModel::new(
                vec![OverlayGroup {
                    background: vec![0],
                    overlay: 3,
                    center: 1.5
                }],
                &z
            ),
            Err(ConfigError::CenterOutOfRange { .. })
        ));
    }

    #[test]
    fn tiny_background_is_floored_and_renormalized() {
        let z = zone();
        let model = OverlayModel::new(
            vec![OverlayGroup {
                background: vec![0],
                overlay: 3,
                center: 0.5,
            }],
            &z,
        )
        .unwrap();
        let st = model.apply(&[0.0, 0.5, 0.4, 0.1, 0.0]);
        assert!(st.areas[0] > 0.0);
        assert!((st.areas.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
