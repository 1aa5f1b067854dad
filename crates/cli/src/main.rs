use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use plurigauss::api::{estimate_frequencies, ProbabilityField, TruncationEngine, TruncationRule};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::fmt::SubscriberBuilder;

mod export;
mod model;
mod provenance;

use model::ModelFile;
use provenance::{write_sidecar, Payload};

#[derive(Parser)]
#[command(name = "plurigauss")]
#[command(about = "Plurigaussian truncation maps: export, check and evaluate")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Write the partition for one probability vector as a vertex CSV
    Polygons {
        #[arg(long)]
        model: PathBuf,
        /// Facies probabilities in model order, comma separated
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        probs: Vec<f64>,
        /// Values of the rule's trends, in the order the rule lists them
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        trend: Vec<f64>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Monte-Carlo check of facies frequencies against the probabilities
    Check {
        #[arg(long)]
        model: PathBuf,
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        probs: Vec<f64>,
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        trend: Vec<f64>,
        #[arg(long, default_value_t = 100_000)]
        samples: usize,
        #[arg(long, default_value_t = 2025)]
        seed: u64,
        /// Allowed frequency error on top of sampling noise
        #[arg(long, default_value_t = 0.02)]
        tol: f64,
    },
    /// Map every cell of an alpha CSV to a facies
    Evaluate {
        #[arg(long)]
        model: PathBuf,
        /// CSV with columns alpha1..alphaN
        #[arg(long)]
        alpha: PathBuf,
        /// CSV with per-cell probability columns (named by facies) and trend columns
        #[arg(long)]
        cells: Option<PathBuf>,
        /// Constant probabilities for facies without a column
        #[arg(long, value_delimiter = ',')]
        probs: Vec<f64>,
        #[arg(long)]
        out: PathBuf,
        /// Evaluate chunks on all cores
        #[arg(long)]
        parallel: bool,
    },
    /// Print version and code revision as JSON
    Report,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    match cmd.action {
        Action::Polygons {
            model,
            probs,
            trend,
            out,
        } => polygons(model, probs, trend, out),
        Action::Check {
            model,
            probs,
            trend,
            samples,
            seed,
            tol,
        } => check(model, probs, trend, samples, seed, tol),
        Action::Evaluate {
            model,
            alpha,
            cells,
            probs,
            out,
            parallel,
        } => evaluate(model, alpha, cells, probs, out, parallel),
        Action::Report => report(),
    }
}

fn polygons(model: PathBuf, probs: Vec<f64>, trend: Vec<f64>, out: PathBuf) -> Result<()> {
    let file = ModelFile::load(&model)?;
    let mut rule = file.rule()?;
    rule.set_trend_values(&trend).context("setting trend values")?;
    rule.set_probabilities(&probs).context("setting probabilities")?;
    let polys = rule.current_polygons()?;
    let mut df = export::polygons_frame(&polys, &file.facies)?;
    export::write_csv(&mut df, &out)?;
    tracing::info!(kind = %rule.kind(), polygons = polys.len(), out = %out.display(), "polygons");
    let params = json!({ "probs": probs, "trend": trend });
    write_sidecar(&out, Payload::new("polygons", params).with_model(&model))?;
    Ok(())
}

fn check(
    model: PathBuf,
    probs: Vec<f64>,
    trend: Vec<f64>,
    samples: usize,
    seed: u64,
    tol: f64,
) -> Result<()> {
    let file = ModelFile::load(&model)?;
    let mut rule = file.rule()?;
    rule.set_trend_values(&trend).context("setting trend values")?;
    let est = estimate_frequencies(&mut rule, &probs, samples, seed)?;
    let diag = rule.diagnostics();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "estimate": est,
            "max_abs_error": est.max_abs_error(),
            "diagnostics": diag,
        }))?
    );
    if !est.within(tol) {
        bail!(
            "observed frequencies deviate from probabilities (max |error| {:.4}, tol {tol})",
            est.max_abs_error()
        );
    }
    Ok(())
}

fn evaluate(
    model: PathBuf,
    alpha: PathBuf,
    cells: Option<PathBuf>,
    probs: Vec<f64>,
    out: PathBuf,
    parallel: bool,
) -> Result<()> {
    let file = ModelFile::load(&model)?;
    let rule = file.rule()?;
    let dims = rule.alpha_dims();
    let trend_names = rule.trend_names();
    let alpha_df = export::read_csv(&alpha)?;
    let alpha_field = export::alpha_from_frame(&alpha_df, dims)?;

    let constant = (!probs.is_empty()).then_some(probs.as_slice());
    let (field, cell_df) = match &cells {
        Some(path) => {
            let df = export::read_csv(path)?;
            (export::probabilities_from_frame(&df, &file.facies, constant)?, Some(df))
        }
        None => match constant {
            Some(p) => (ProbabilityField::constant(p), None),
            None => bail!("need --cells or --probs"),
        },
    };

    let mut engine = TruncationEngine::new(rule, field, file.engine)?;
    for name in &trend_names {
        let Some(df) = &cell_df else {
            bail!("rule reads trend '{name}'; pass it as a column of --cells");
        };
        engine = engine.with_trend(name, export::f64_column(df, name)?)?;
    }
    let located = if parallel {
        engine.evaluate_par(&alpha_field)?
    } else {
        engine.evaluate(&alpha_field)?
    };
    let mut df = export::locations_frame(&located, &file.facies)?;
    export::write_csv(&mut df, &out)?;

    let report = engine.report();
    let params = json!({
        "alpha": alpha.to_string_lossy(),
        "cells": cells.as_ref().map(|c| c.to_string_lossy().into_owned()),
        "probs": probs,
        "parallel": parallel,
        "report": report,
    });
    write_sidecar(&out, Payload::new("evaluate", params).with_model(&model))?;
    Ok(())
}

fn report() -> Result<()> {
    let obj = json!({
        "code_rev": provenance::code_rev(),
        "version": plurigauss::VERSION,
        "rules": ["angle", "cubic", "bayfill"],
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn demo(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("models").join(name)
    }

    #[test]
    fn polygons_writes_csv_and_sidecar() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("angle.csv");
        let probs = vec![0.4, 0.3, 0.2, 0.1];
        polygons(demo("angle_demo.json"), probs, vec![30.0], out.clone()).unwrap();
        let df = export::read_csv(&out).unwrap();
        assert!(df.height() >= 9);
        assert!(dir.path().join("angle.provenance.json").exists());
    }

    #[test]
    fn check_passes_for_bayfill_demo() {
        check(demo("bayfill_demo.json"), vec![0.2; 5], vec![], 20_000, 7, 0.02).unwrap();
    }

    #[test]
    fn evaluate_reads_cells_and_alpha() {
        let dir = tempdir().unwrap();
        let alpha = dir.path().join("alpha.csv");
        let cells = dir.path().join("cells.csv");
        let out = dir.path().join("facies.csv");
        let rows = "alpha1,alpha2,alpha3\n0.1,0.5,0.9\n0.9,0.1,0.5\n0.2,0.95,0.5\n";
        fs::write(&alpha, rows).unwrap();
        fs::write(&cells, "F1,azimuth\n0.5,45.0\n0.4,45.0\n0.4,30.0\n").unwrap();
        evaluate(
            demo("angle_demo.json"),
            alpha,
            Some(cells),
            vec![0.5, 0.2, 0.2, 0.1],
            out.clone(),
            true,
        )
        .unwrap();
        let df = export::read_csv(&out).unwrap();
        assert_eq!(df.height(), 3);
        let sidecar = fs::read(dir.path().join("facies.provenance.json")).unwrap();
        let prov: serde_json::Value = serde_json::from_slice(&sidecar).unwrap();
        assert_eq!(prov["params"]["report"]["cells"], 3);
        assert_eq!(prov["params"]["report"]["normalization_corrections"], 2);
    }
}
