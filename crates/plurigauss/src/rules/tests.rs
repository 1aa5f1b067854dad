use super::spec::{
    AnglePolygonSpec, BayfillSpec, CubicAxis, CubicNodeSpec, CubicSpec, OverlayGroupSpec,
    ParamSource,
};
use super::*;
use crate::error::ProbabilityError;
use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn catalog3() -> FaciesCatalog {
    FaciesCatalog::from_pairs([("F1", 1), ("F2", 2), ("F3", 3)]).unwrap()
}

fn bay_catalog() -> FaciesCatalog {
    FaciesCatalog::from_pairs([
        ("FP", 10),
        ("SB", 20),
        ("WBF", 30),
        ("BHD", 40),
        ("LG", 50),
    ])
    .unwrap()
}

fn slot(facies: &str, angle: f64) -> AnglePolygonSpec {
    AnglePolygonSpec {
        facies: facies.into(),
        angle: ParamSource::Constant(angle),
        fraction: 1.0,
    }
}

fn angle_spec() -> RuleSpec {
    RuleSpec::Angle(spec::AngleSpec {
        polygons: vec![slot("F1", -90.0), slot("F2", 45.0), slot("F3", 45.0)],
        overlay: vec![],
    })
}

fn bay_spec(sf: f64, ysf: f64, sbhd: f64) -> RuleSpec {
    RuleSpec::Bayfill(BayfillSpec {
        floodplain: "FP".into(),
        subbay: "SB".into(),
        wave_influenced: "WBF".into(),
        bayhead_delta: "BHD".into(),
        lagoon: "LG".into(),
        sf: ParamSource::Constant(sf),
        ysf,
        sbhd,
    })
}

fn cubic_spec() -> RuleSpec {
    let leaf = |f: &str| CubicNodeSpec::Leaf {
        facies: f.into(),
        fraction: 1.0,
    };
    RuleSpec::Cubic(CubicSpec {
        axis: CubicAxis::X,
        nodes: vec![
            leaf("F1"),
            CubicNodeSpec::Group {
                split: vec![leaf("F2"), leaf("F3")],
            },
        ],
        overlay: vec![],
    })
}

fn configured(spec: &RuleSpec, catalog: &FaciesCatalog) -> Rule {
    Rule::configure(spec, catalog, RuleCfg::default()).unwrap()
}

fn code_at(rule: &Rule, alpha: &[f64]) -> i32 {
    rule.locate(alpha).unwrap().code
}

/// Sampled frequency per zone facies over `n` uniform alpha points.
fn sample_frequencies(rule: &Rule, n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts = vec![0usize; rule.catalog().len()];
    let mut alpha = vec![0.0; rule.alpha_dims()];
    for _ in 0..n {
        alpha.iter_mut().for_each(|a| *a = rng.gen::<f64>());
        counts[rule.locate(&alpha).unwrap().index] += 1;
    }
    counts.into_iter().map(|c| c as f64 / n as f64).collect()
}

fn assert_fidelity(freq: &[f64], probs: &[f64], n: usize) {
    for (f, p) in freq.iter().zip(probs) {
        let noise = 3.0 * (p * (1.0 - p) / n as f64).sqrt();
        assert!((f - p).abs() <= 0.02 + noise, "freq {freq:?} vs probs {probs:?}");
    }
}

fn assert_vertices(polygon: &Polygon, expected: &[[f64; 2]]) {
    assert_eq!(polygon.len(), expected.len(), "vertices {:?}", polygon.verts);
    for (v, e) in polygon.verts.iter().zip(expected) {
        assert!(
            (v.x - e[0]).abs() < 1e-12 && (v.y - e[1]).abs() < 1e-12,
            "vertex ({}, {}) vs {e:?} in {:?}",
            v.x,
            v.y,
            polygon.verts
        );
    }
}

/// Cell centers of a regular `n^dims` grid over the unit cube, last axis fastest.
fn grid_alphas(n: usize, dims: usize) -> Vec<Vec<f64>> {
    let mut out = Vec::new();
    for flat in 0..n.pow(dims as u32) {
        let mut alpha = vec![0.0; dims];
        let mut rest = flat;
        for d in (0..dims).rev() {
            alpha[d] = ((rest % n) as f64 + 0.5) / n as f64;
            rest /= n;
        }
        out.push(alpha);
    }
    out
}

const ANGLE_REFERENCE_CODES: [i32; 64] = [
    1, 1, 1, 1, 1, 1, 1, 1, //
    1, 1, 1, 1, 1, 1, 1, 1, //
    1, 1, 1, 1, 1, 1, 1, 1, //
    1, 1, 1, 1, 1, 1, 1, 1, //
    2, 2, 2, 3, 3, 3, 3, 3, //
    2, 2, 2, 2, 3, 3, 3, 3, //
    2, 2, 2, 2, 2, 3, 3, 3, //
    2, 2, 2, 2, 2, 2, 3, 3, //
];

const BAYFILL_REFERENCE_CODES: [i32; 64] = [
    50, 50, 50, 50, 50, 50, 50, 50, 20, 20, 20, 20, 10, 10, 10, 10, //
    40, 40, 30, 30, 40, 40, 30, 30, 20, 20, 20, 20, 10, 10, 10, 10, //
    40, 40, 30, 30, 40, 40, 30, 30, 20, 20, 20, 20, 10, 10, 10, 10, //
    40, 40, 30, 30, 40, 40, 30, 30, 20, 20, 20, 20, 10, 10, 10, 10, //
];

#[test]
fn angle_scenario_regions() {
    let mut rule = configured(&angle_spec(), &catalog3());
    rule.set_probabilities(&[0.5, 0.3, 0.2]).unwrap();
    for (alpha, code) in [
        ([0.25, 0.5], 1),
        ([0.1, 0.1], 1),
        ([0.75, 0.2], 2),
        ([0.9, 0.3], 2),
        ([0.6, 0.8], 3),
        ([0.55, 0.95], 3),
        ([0.95, 0.99], 3),
    ] {
        assert_eq!(code_at(&rule, &alpha), code, "alpha {alpha:?}");
    }
    let polys = rule.current_polygons().unwrap();
    assert_eq!(polys.len(), 3);
    assert!((polys[0].polygon.area() - 0.5).abs() < 1e-9);
    assert!((polys[1].polygon.area() - 0.3).abs() <= 0.01 + 1e-12);
    let total: f64 = polys.iter().map(|p| p.polygon.area()).sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn angle_scenario_matches_reference_partition() {
    let mut rule = configured(&angle_spec(), &catalog3());
    rule.set_probabilities(&[0.5, 0.3, 0.2]).unwrap();
    let polys = rule.current_polygons().unwrap();
    // F1 is exact; F2 stops at the fourth bisection step, 0.003125 short.
    assert_vertices(
        &polys[0].polygon,
        &[[0.0, 0.0], [0.5, 0.0], [0.5, 1.0], [0.0, 1.0]],
    );
    assert_vertices(
        &polys[1].polygon,
        &[[0.5, 0.0], [1.0, 0.0], [1.0, 0.84375], [0.5, 0.34375]],
    );
    assert_vertices(
        &polys[2].polygon,
        &[[1.0, 0.84375], [1.0, 1.0], [0.5, 1.0], [0.5, 0.34375]],
    );
    assert!((polys[1].polygon.area() - 0.296875).abs() < 1e-12);

    let codes: Vec<i32> = grid_alphas(8, 2).iter().map(|a| code_at(&rule, a)).collect();
    assert_eq!(codes, ANGLE_REFERENCE_CODES);
    assert_eq!(rule.diagnostics().boundary_retries, 0);
}

#[test]
fn angle_reference_corner_follows_normal_quadrant() {
    let (n, corner) = angle::boundary_line(-90.0);
    assert!((n.x - 1.0).abs() < 1e-12);
    assert_eq!((corner.x, corner.y), (0.0, 0.0));
    let (_, corner) = angle::boundary_line(45.0);
    assert_eq!((corner.x, corner.y), (1.0, 0.0));
    let (_, corner) = angle::boundary_line(135.0);
    assert_eq!((corner.x, corner.y), (1.0, 1.0));
    let (_, corner) = angle::boundary_line(-135.0);
    assert_eq!((corner.x, corner.y), (0.0, 1.0));
}

#[test]
fn angle_monte_carlo_fidelity() {
    let mut rule = configured(&angle_spec(), &catalog3());
    let probs = [0.45, 0.35, 0.2];
    rule.set_probabilities(&probs).unwrap();
    let n = 20_000;
    assert_fidelity(&sample_frequencies(&rule, n, 11), &probs, n);
}

#[test]
fn split_fractions_give_two_polygons_for_one_facies() {
    let spec = RuleSpec::Angle(spec::AngleSpec {
        polygons: vec![
            AnglePolygonSpec {
                facies: "F1".into(),
                angle: ParamSource::Constant(-90.0),
                fraction: 0.5,
            },
            slot("F2", 0.0),
            AnglePolygonSpec {
                facies: "F1".into(),
                angle: ParamSource::Constant(0.0),
                fraction: 0.5,
            },
            slot("F3", 0.0),
        ],
        overlay: vec![],
    });
    let mut rule = configured(&spec, &catalog3());
    let probs = [0.4, 0.3, 0.3];
    rule.set_probabilities(&probs).unwrap();
    let Rule::Angle(angle) = &rule else {
        panic!("expected angle rule")
    };
    let map = angle.map().unwrap();
    assert_eq!(map.slots.iter().filter(|s| s.facies == 0).count(), 2);
    assert!((map.facies_area(0) - 0.4).abs() < 0.02);
    let n = 20_000;
    assert_fidelity(&sample_frequencies(&rule, n, 5), &probs, n);
}

#[test]
fn locate_is_deterministic() {
    let mut a = configured(&angle_spec(), &catalog3());
    let mut b = configured(&angle_spec(), &catalog3());
    a.set_probabilities(&[0.37, 0.41, 0.22]).unwrap();
    b.set_probabilities(&[0.37, 0.41, 0.22]).unwrap();
    assert_eq!(a.current_polygons().unwrap(), b.current_polygons().unwrap());
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..500 {
        let alpha = [rng.gen::<f64>(), rng.gen::<f64>()];
        assert_eq!(a.locate(&alpha).unwrap(), b.locate(&alpha).unwrap());
        assert_eq!(a.locate(&alpha).unwrap(), a.locate(&alpha).unwrap());
    }
}

#[test]
fn determined_facies_short_circuits_every_rule() {
    let cases = [
        (angle_spec(), catalog3(), vec![0.0, 0.9995, 0.0005], 2),
        (cubic_spec(), catalog3(), vec![0.9999, 0.0001, 0.0], 1),
        (bay_spec(0.3, 0.5, 0.5), bay_catalog(), vec![0.0, 0.0, 0.0, 1.0, 0.0], 40),
    ];
    let mut rng = StdRng::seed_from_u64(9);
    for (spec, catalog, probs, code) in cases {
        let mut rule = configured(&spec, &catalog);
        rule.set_probabilities(&probs).unwrap();
        for _ in 0..200 {
            let alpha: Vec<f64> = (0..rule.alpha_dims()).map(|_| rng.gen()).collect();
            assert_eq!(code_at(&rule, &alpha), code);
        }
        let polys = rule.current_polygons().unwrap();
        let full: Vec<_> = polys.iter().filter(|p| !p.polygon.is_empty()).collect();
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].code, code);
        assert!((full[0].polygon.area() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn upper_edges_are_claimed_through_the_nudge() {
    let mut rule = configured(&angle_spec(), &catalog3());
    rule.set_probabilities(&[0.5, 0.3, 0.2]).unwrap();
    assert_eq!(code_at(&rule, &[1.0, 1.0]), 3);
    assert_eq!(code_at(&rule, &[0.25, 1.0]), 1);
    assert_eq!(code_at(&rule, &[1.0, 0.1]), 2);
    assert_eq!(rule.diagnostics().boundary_retries, 3);
    rule.reset_diagnostics();
    assert_eq!(rule.diagnostics(), Diagnostics::default());
}

#[test]
fn overlay_is_confined_to_its_background() {
    let catalog = FaciesCatalog::from_pairs([("F1", 1), ("F2", 2), ("F3", 3), ("OV", 9)]).unwrap();
    let spec = RuleSpec::Angle(spec::AngleSpec {
        polygons: vec![slot("F1", -90.0), slot("F2", 45.0), slot("F3", 45.0)],
        overlay: vec![OverlayGroupSpec {
            background: vec!["F1".into()],
            overlay: "OV".into(),
            center: 0.5,
        }],
    });
    let mut rule = configured(&spec, &catalog);
    assert_eq!(rule.alpha_dims(), 3);
    let probs = [0.3, 0.3, 0.2, 0.2];
    rule.set_probabilities(&probs).unwrap();
    let Rule::Angle(angle) = &rule else {
        panic!("expected angle rule")
    };
    let map = angle.map().unwrap();
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..2_000 {
        let alpha = [rng.gen(), rng.gen(), rng.gen()];
        let hit = rule.locate(&alpha).unwrap();
        if hit.index == 3 {
            let slot = map.find_slot(nalgebra::vector![alpha[0], alpha[1]]);
            assert_eq!(slot.map(|s| map.slots[s].facies), Some(0));
        }
    }
    let n = 40_000;
    assert_fidelity(&sample_frequencies(&rule, n, 4), &probs, n);
}

#[test]
fn bayfill_baseline_regions() {
    let mut rule = configured(&bay_spec(0.0, 0.0, 0.0), &bay_catalog());
    rule.set_probabilities(&[0.2; 5]).unwrap();
    assert_eq!(code_at(&rule, &[0.5, 0.9, 0.5]), 10);
    assert_eq!(code_at(&rule, &[0.2, 0.7, 0.5]), 20);
    assert_eq!(code_at(&rule, &[0.1, 0.3, 0.5]), 50);
    assert_eq!(code_at(&rule, &[0.7, 0.3, 0.2]), 40);
    assert_eq!(code_at(&rule, &[0.7, 0.3, 0.8]), 30);

    let Rule::Bayfill(bay) = &rule else {
        panic!("expected bayfill rule")
    };
    let map = bay.map().unwrap();
    assert_eq!(map.mouth, Some(MouthCase::FullMouth));
    assert_eq!(map.shorelines, Some((ShorelineCase::Flat, ShorelineCase::Flat)));
    assert!((map.zm - 0.5).abs() < 1e-9);
    assert!((map.lagoon_x - 1.0 / 3.0).abs() < 1e-9);
    assert!((map.strip_x - 1.0).abs() < 1e-9);
    assert!(map.region_polygon(BayfillRegion::SubbayStrip).is_empty());
    assert_eq!(
        map.region_at(nalgebra::vector![0.7, 0.3]),
        Some(BayfillRegion::Shared)
    );
    assert_eq!(bay.z_threshold(), Some(map.zm));
}

#[test]
fn bayfill_baseline_matches_reference_partition() {
    let mut rule = configured(&bay_spec(0.0, 0.0, 0.0), &bay_catalog());
    rule.set_probabilities(&[0.2; 5]).unwrap();
    let Rule::Bayfill(bay) = &rule else {
        panic!("expected bayfill rule")
    };
    let map = bay.map().unwrap();
    let x = 1.0 / 3.0;
    assert_vertices(
        map.region_polygon(BayfillRegion::Floodplain),
        &[[1.0, 0.8], [1.0, 1.0], [0.0, 1.0], [0.0, 0.8]],
    );
    assert_vertices(
        map.region_polygon(BayfillRegion::SubbayBand),
        &[[1.0, 0.6], [1.0, 0.8], [0.0, 0.8], [0.0, 0.6]],
    );
    assert_vertices(map.region_polygon(BayfillRegion::SubbayStrip), &[]);
    assert_vertices(
        map.region_polygon(BayfillRegion::Lagoon),
        &[[0.0, 0.0], [x, 0.0], [x, 0.6], [0.0, 0.6]],
    );
    assert_vertices(map.region_polygon(BayfillRegion::WaveInfluenced), &[]);
    assert_vertices(
        map.region_polygon(BayfillRegion::Shared),
        &[[x, 0.0], [1.0, 0.0], [1.0, 0.6], [x, 0.6]],
    );

    let codes: Vec<i32> = grid_alphas(4, 3).iter().map(|a| code_at(&rule, a)).collect();
    assert_eq!(codes, BAYFILL_REFERENCE_CODES);
}

#[test]
fn bayfill_monte_carlo_fidelity_across_shapes() {
    let probs = [0.25, 0.2, 0.15, 0.1, 0.3];
    for (k, (sf, ysf, sbhd)) in [(0.0, 0.0, 0.0), (0.4, 0.5, 0.5), (1.0, 1.0, 0.9), (0.2, 0.3, 1.0)]
        .into_iter()
        .enumerate()
    {
        let mut rule = configured(&bay_spec(sf, ysf, sbhd), &bay_catalog());
        rule.set_probabilities(&probs).unwrap();
        let polys = rule.current_polygons().unwrap();
        let total: f64 = polys.iter().map(|p| p.polygon.area()).sum();
        assert!((total - 1.0).abs() < 1e-9, "sf={sf} ysf={ysf} sbhd={sbhd}");
        let n = 20_000;
        assert_fidelity(&sample_frequencies(&rule, n, 100 + k as u64), &probs, n);
    }
}

#[test]
fn bayfill_wedge_case_puts_wbf_outside_the_wedge() {
    let mut rule = configured(&bay_spec(0.0, 0.0, 0.9), &bay_catalog());
    rule.set_probabilities(&[0.2, 0.2, 0.3, 0.05, 0.25]).unwrap();
    let Rule::Bayfill(bay) = &rule else {
        panic!("expected bayfill rule")
    };
    let map = bay.map().unwrap();
    assert_eq!(map.mouth, Some(MouthCase::Wedge));
    let wedge = map.region_polygon(BayfillRegion::Shared).area();
    let rest = map.region_polygon(BayfillRegion::WaveInfluenced).area();
    assert!((wedge + rest - 0.35).abs() < 1e-9);
    assert!((map.zm * wedge - 0.05).abs() < 1e-9);
}

#[test]
fn bayfill_sf_trend() {
    let catalog = bay_catalog();
    let RuleSpec::Bayfill(mut spec) = bay_spec(0.0, 0.2, 0.5) else {
        unreachable!()
    };
    spec.sf = ParamSource::Trend {
        trend: "slant".into(),
    };
    let mut rule = configured(&RuleSpec::Bayfill(spec), &catalog);
    assert_eq!(rule.trend_names(), vec!["slant".to_string()]);
    rule.set_trend_values(&[0.6]).unwrap();
    rule.set_probabilities(&[0.2; 5]).unwrap();
    let Rule::Bayfill(bay) = &rule else {
        panic!("expected bayfill rule")
    };
    assert_eq!(bay.sf(), 0.6);
    assert_eq!(
        bay.map().unwrap().shorelines,
        Some((ShorelineCase::TopCorner, ShorelineCase::Band))
    );
    assert!(matches!(
        rule.set_trend_values(&[1.5]),
        Err(TruncationError::Config(ConfigError::ParameterOutOfRange { .. }))
    ));
    assert!(matches!(
        rule.set_trend_values(&[]),
        Err(TruncationError::TrendLength { expected: 1, got: 0 })
    ));
}

#[test]
fn angle_trend_drives_slot_angle() {
    let spec = RuleSpec::Angle(spec::AngleSpec {
        polygons: vec![
            AnglePolygonSpec {
                facies: "F1".into(),
                angle: ParamSource::Trend {
                    trend: "azimuth".into(),
                },
                fraction: 1.0,
            },
            slot("F2", 45.0),
            slot("F3", 45.0),
        ],
        overlay: vec![],
    });
    let mut rule = configured(&spec, &catalog3());
    assert_eq!(rule.trend_names(), vec!["azimuth".to_string()]);
    // F1 on the bottom half.
    rule.set_trend_values(&[0.0]).unwrap();
    rule.set_probabilities(&[0.5, 0.3, 0.2]).unwrap();
    assert_eq!(code_at(&rule, &[0.9, 0.1]), 1);
    // F1 on the left half.
    rule.set_trend_values(&[-90.0]).unwrap();
    rule.set_probabilities(&[0.5, 0.3, 0.2]).unwrap();
    assert_eq!(code_at(&rule, &[0.1, 0.9]), 1);
}

#[test]
fn cubic_layout_is_nested_rectangles() {
    let mut rule = configured(&cubic_spec(), &catalog3());
    rule.set_probabilities(&[0.4, 0.3, 0.3]).unwrap();
    // F1: x < 0.4; F2, F3 split the right column along y at 0.5.
    assert_eq!(code_at(&rule, &[0.2, 0.9]), 1);
    assert_eq!(code_at(&rule, &[0.7, 0.2]), 2);
    assert_eq!(code_at(&rule, &[0.7, 0.8]), 3);
    let polys = rule.current_polygons().unwrap();
    for (p, want) in polys.iter().zip([0.4, 0.3, 0.3]) {
        assert!((p.polygon.area() - want).abs() < 1e-12);
    }
    let n = 20_000;
    assert_fidelity(&sample_frequencies(&rule, n, 8), &[0.4, 0.3, 0.3], n);
}

#[test]
fn memoized_rule_matches_uncached_on_grid_aligned_input() {
    let cfg = RuleCfg {
        memo: Some(MemoCfg::default()),
        ..RuleCfg::default()
    };
    let mut cached = Rule::configure(&angle_spec(), &catalog3(), cfg).unwrap();
    let mut plain = configured(&angle_spec(), &catalog3());
    let mut rng = StdRng::seed_from_u64(17);
    for probs in [[0.5, 0.3, 0.2], [0.25, 0.25, 0.5], [0.5, 0.3, 0.2]] {
        cached.set_probabilities(&probs).unwrap();
        plain.set_probabilities(&probs).unwrap();
        assert_eq!(cached.current_polygons().unwrap(), plain.current_polygons().unwrap());
        for _ in 0..200 {
            let alpha = [rng.gen::<f64>(), rng.gen::<f64>()];
            assert_eq!(cached.locate(&alpha).unwrap(), plain.locate(&alpha).unwrap());
        }
    }
    let d = cached.diagnostics();
    assert_eq!((d.cache_hits, d.rebuilds), (1, 2));
    assert_eq!(plain.diagnostics().rebuilds, 3);
}

#[test]
fn memoized_rule_keeps_rare_facies_off_grid() {
    let cfg = RuleCfg {
        memo: Some(MemoCfg::default()),
        ..RuleCfg::default()
    };
    let probs = [0.996, 0.002, 0.002];
    let mut cached = Rule::configure(&angle_spec(), &catalog3(), cfg).unwrap();
    let mut plain = configured(&angle_spec(), &catalog3());
    cached.set_probabilities(&probs).unwrap();
    plain.set_probabilities(&probs).unwrap();

    let live = |rule: &Rule| {
        let polys = rule.current_polygons().unwrap();
        polys.iter().filter(|p| p.polygon.area() > 0.0).count()
    };
    assert_eq!(live(&cached), 3);
    assert_eq!(live(&plain), 3);

    let n = 20_000;
    let c = sample_frequencies(&cached, n, 41);
    let p = sample_frequencies(&plain, n, 41);
    assert!(c[1] > 0.0 && c[2] > 0.0, "cached {c:?}");
    for (a, b) in c.iter().zip(&p) {
        assert!((a - b).abs() < 0.02, "cached {c:?} vs uncached {p:?}");
    }
}

#[test]
fn memoized_rule_decides_determined_on_exact_probabilities() {
    let cfg = RuleCfg {
        memo: Some(MemoCfg::default()),
        ..RuleCfg::default()
    };
    let mut cached = Rule::configure(&angle_spec(), &catalog3(), cfg).unwrap();
    cached.set_probabilities(&[0.0, 0.9995, 0.0005]).unwrap();
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..200 {
        let alpha = [rng.gen::<f64>(), rng.gen::<f64>()];
        assert_eq!(code_at(&cached, &alpha), 2);
    }
    // Determined maps are not cached.
    cached.set_probabilities(&[0.0, 0.9995, 0.0005]).unwrap();
    let d = cached.diagnostics();
    assert_eq!((d.cache_hits, d.rebuilds), (0, 2));
}

#[test]
fn determined_threshold_is_inclusive() {
    let cfg = RuleCfg {
        determined_eps: 0.25,
        ..RuleCfg::default()
    };
    let mut rule = Rule::configure(&angle_spec(), &catalog3(), cfg).unwrap();
    rule.set_probabilities(&[0.75, 0.25, 0.0]).unwrap();
    assert_eq!(code_at(&rule, &[0.99, 0.99]), 1);
    assert_eq!(code_at(&rule, &[0.9, 0.1]), 1);
    rule.set_probabilities(&[0.7, 0.3, 0.0]).unwrap();
    assert_eq!(code_at(&rule, &[0.99, 0.99]), 2);
}

#[test]
fn probabilities_are_validated() {
    let mut rule = configured(&angle_spec(), &catalog3());
    assert_eq!(rule.locate(&[0.5, 0.5]), Err(TruncationError::NotReady));
    assert!(matches!(
        rule.set_probabilities(&[0.5, 0.5]),
        Err(TruncationError::Probability(ProbabilityError::Length { expected: 3, got: 2 }))
    ));
    assert!(matches!(
        rule.set_probabilities(&[0.5, 0.3, 0.3]),
        Err(TruncationError::Probability(ProbabilityError::NotNormalized { .. }))
    ));
    rule.set_probabilities(&[0.5, 0.3, 0.2]).unwrap();
    assert!(matches!(
        rule.locate(&[0.5]),
        Err(TruncationError::AlphaDimension { expected: 2, got: 1 })
    ));
}

#[test]
fn configuration_errors() {
    let cat = catalog3();
    let missing = RuleSpec::Angle(spec::AngleSpec {
        polygons: vec![slot("F1", 0.0), slot("F2", 0.0)],
        overlay: vec![],
    });
    assert!(matches!(
        Rule::configure(&missing, &cat, RuleCfg::default()),
        Err(ConfigError::FaciesSetMismatch { .. })
    ));
    let bad_fraction = RuleSpec::Angle(spec::AngleSpec {
        polygons: vec![
            AnglePolygonSpec {
                facies: "F1".into(),
                angle: ParamSource::Constant(0.0),
                fraction: 0.6,
            },
            slot("F2", 0.0),
            slot("F3", 0.0),
        ],
        overlay: vec![],
    });
    assert!(matches!(
        Rule::configure(&bad_fraction, &cat, RuleCfg::default()),
        Err(ConfigError::FractionSum { .. })
    ));
    assert!(matches!(
        Rule::configure(&bay_spec(0.0, 1.2, 0.0), &bay_catalog(), RuleCfg::default()),
        Err(ConfigError::ParameterOutOfRange { .. })
    ));
    assert!(matches!(
        Rule::configure(&bay_spec(0.0, 0.0, 0.0), &cat, RuleCfg::default()),
        Err(ConfigError::FaciesSetMismatch { .. })
    ));
}

#[test]
fn rule_kind_parses_short_and_model_names() {
    assert_eq!("angle".parse::<RuleKind>().unwrap(), RuleKind::Angle);
    assert_eq!("Trunc2D_Cubic".parse::<RuleKind>().unwrap(), RuleKind::Cubic);
    assert_eq!("trunc3d_bayfill".parse::<RuleKind>().unwrap(), RuleKind::Bayfill);
    assert!(matches!("nope".parse::<RuleKind>(), Err(ConfigError::UnknownRule(_))));
    assert_eq!(RuleKind::Bayfill.to_string(), "bayfill");
}

#[test]
fn rule_spec_from_json() {
    let json = r#"{
        "rule": "angle",
        "polygons": [
            { "facies": "F1", "angle": -90.0 },
            { "facies": "F2", "angle": { "trend": "azimuth" }, "fraction": 1.0 },
            { "facies": "F3", "angle": 45 }
        ]
    }"#;
    let spec: RuleSpec = serde_json::from_str(json).unwrap();
    assert_eq!(spec.kind(), RuleKind::Angle);
    let RuleSpec::Angle(angle) = &spec else {
        unreachable!()
    };
    assert_eq!(angle.polygons[1].angle.trend(), Some("azimuth"));
    assert!(angle.overlay.is_empty());

    let json = r#"{ "rule": "cubic", "axis": "y",
        "nodes": [
            { "facies": "F1" },
            { "split": [ { "facies": "F2" }, { "facies": "F3" } ] }
        ] }"#;
    let spec: RuleSpec = serde_json::from_str(json).unwrap();
    let rule = configured(&spec, &catalog3());
    assert_eq!(rule.kind(), RuleKind::Cubic);

    let cfg: RuleCfg = serde_json::from_str(r#"{ "memo": { "resolution": 50 } }"#).unwrap();
    assert_eq!(cfg.memo.map(|m| m.resolution), Some(50));
    assert_eq!(cfg.nudge, 1e-6);
}

fn probs_strategy(n: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..1.0, n).prop_filter_map("all zero", |raw| {
        let sum: f64 = raw.iter().sum();
        (sum > 1e-3).then(|| raw.iter().map(|v| v / sum).collect())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn angle_partition_is_complete(
        probs in probs_strategy(3),
        a1 in -180.0f64..180.0,
        a2 in -180.0f64..180.0,
        x in 0.0f64..=1.0,
        y in 0.0f64..=1.0,
    ) {
        let spec = RuleSpec::Angle(spec::AngleSpec {
            polygons: vec![slot("F1", a1), slot("F2", a2), slot("F3", 0.0)],
            overlay: vec![],
        });
        let mut rule = configured(&spec, &catalog3());
        rule.set_probabilities(&probs).unwrap();
        let total: f64 = rule.current_polygons().unwrap().iter().map(|p| p.polygon.area()).sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
        prop_assert!(rule.locate(&[x, y]).is_ok());
    }

    #[test]
    fn bayfill_partition_is_complete(
        probs in probs_strategy(5),
        sf in 0.0f64..=1.0,
        ysf in 0.0f64..=1.0,
        sbhd in 0.0f64..=1.0,
        x in 0.0f64..=1.0,
        y in 0.0f64..=1.0,
        z in 0.0f64..=1.0,
    ) {
        let mut rule = configured(&bay_spec(sf, ysf, sbhd), &bay_catalog());
        rule.set_probabilities(&probs).unwrap();
        let total: f64 = rule.current_polygons().unwrap().iter().map(|p| p.polygon.area()).sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
        prop_assert!(rule.locate(&[x, y, z]).is_ok());
    }
}
