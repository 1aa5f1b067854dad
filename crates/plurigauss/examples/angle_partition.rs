//! Print the Angle partition for three facies and a Monte-Carlo check.
//!
//! Usage:
//!   cargo run -p plurigauss --example angle_partition -- 0.5 0.3 0.2

use plurigauss::api::{
    estimate_frequencies, AnglePolygonSpec, AngleSpec, FaciesCatalog, ParamSource, Rule, RuleCfg,
    RuleSpec, TruncationRule,
};

fn main() {
    let probs: Vec<f64> = std::env::args()
        .skip(1)
        .filter_map(|a| a.parse().ok())
        .collect();
    let probs = if probs.len() == 3 { probs } else { vec![0.5, 0.3, 0.2] };
    let catalog = FaciesCatalog::from_pairs([("F1", 1), ("F2", 2), ("F3", 3)]).unwrap();
    let slot = |facies: &str, angle: f64| AnglePolygonSpec {
        facies: facies.into(),
        angle: ParamSource::Constant(angle),
        fraction: 1.0,
    };
    let spec = RuleSpec::Angle(AngleSpec {
        polygons: vec![slot("F1", -90.0), slot("F2", 45.0), slot("F3", 45.0)],
        overlay: vec![],
    });
    let mut rule = Rule::configure(&spec, &catalog, RuleCfg::default()).unwrap();
    let est = estimate_frequencies(&mut rule, &probs, 50_000, 2025).unwrap();
    for p in rule.current_polygons().unwrap() {
        let verts: Vec<String> = p
            .polygon
            .verts
            .iter()
            .map(|v| format!("({:.3}, {:.3})", v.x, v.y))
            .collect();
        println!(
            "slot {} code {} area {:.4}: {}",
            p.slot,
            p.code,
            p.polygon.area(),
            verts.join(" ")
        );
    }
    println!(
        "expected {:?}\nobserved {:?}\nmax |error| {:.4}",
        est.expected,
        est.observed,
        est.max_abs_error()
    );
}
