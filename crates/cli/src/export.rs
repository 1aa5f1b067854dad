//! CSV tables in and out of the truncation engine, via polars.

use anyhow::{bail, Context, Result};
use plurigauss::api::{
    AlphaField, FaciesCatalog, FaciesPolygon, FaciesProbability, Located, ProbabilityField,
};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;

/// One row per polygon vertex; empty polygons get no rows. `cx`/`cy` repeat
/// the polygon's vertex centroid on every row, for labelling plots.
pub fn polygons_frame(polys: &[FaciesPolygon], catalog: &FaciesCatalog) -> Result<DataFrame> {
    let mut slot = Vec::new();
    let mut facies = Vec::new();
    let mut code = Vec::new();
    let mut vertex = Vec::new();
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut area = Vec::new();
    let mut cx = Vec::new();
    let mut cy = Vec::new();
    for p in polys {
        let Some(c) = p.polygon.centroid() else {
            continue;
        };
        let a = p.polygon.area();
        for (k, v) in p.polygon.verts.iter().enumerate() {
            slot.push(p.slot as u32);
            facies.push(catalog.name(p.facies).to_string());
            code.push(p.code);
            vertex.push(k as u32);
            x.push(v.x);
            y.push(v.y);
            area.push(a);
            cx.push(c.x);
            cy.push(c.y);
        }
    }
    Ok(df!(
        "slot" => slot,
        "facies" => facies,
        "code" => code,
        "vertex" => vertex,
        "x" => x,
        "y" => y,
        "area" => area,
        "cx" => cx,
        "cy" => cy,
    )?)
}

/// One row per cell: facies code and name.
pub fn locations_frame(located: &[Located], catalog: &FaciesCatalog) -> Result<DataFrame> {
    let cell: Vec<u32> = (0..located.len() as u32).collect();
    let code: Vec<i32> = located.iter().map(|l| l.code).collect();
    let facies: Vec<String> = located.iter().map(|l| catalog.name(l.index).to_string()).collect();
    Ok(df!("cell" => cell, "code" => code, "facies" => facies)?)
}

pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let lf = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(100))
        .finish()
        .with_context(|| format!("opening {}", path.display()))?;
    let df = lf.collect().with_context(|| format!("reading {}", path.display()))?;
    tracing::debug!(rows = df.height(), cols = df.width(), path = %path.display(), "read csv");
    Ok(df)
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Column `name` as `f64`; nulls are an error.
pub fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let col = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::Float64)?;
    col.f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.with_context(|| format!("null in column '{name}' at row {row}")))
        .collect()
}

/// Columns `alpha1..alpha{dims}` interleaved per cell.
pub fn alpha_from_frame(df: &DataFrame, dims: usize) -> Result<AlphaField> {
    let columns = (1..=dims)
        .map(|k| f64_column(df, &format!("alpha{k}")))
        .collect::<Result<Vec<_>>>()?;
    Ok(AlphaField::from_columns(&columns)?)
}

/// One per-cell column per facies name; facies without a column fall back to
/// `constant` when given.
pub fn probabilities_from_frame(
    df: &DataFrame,
    catalog: &FaciesCatalog,
    constant: Option<&[f64]>,
) -> Result<ProbabilityField> {
    if let Some(c) = constant {
        if c.len() != catalog.len() {
            bail!("{} constant probabilities for {} facies", c.len(), catalog.len());
        }
    }
    let mut facies = Vec::with_capacity(catalog.len());
    for (i, name) in catalog.names().iter().enumerate() {
        if has_column(df, name) {
            facies.push(FaciesProbability::PerCell(f64_column(df, name)?));
        } else if let Some(c) = constant {
            facies.push(FaciesProbability::Constant(c[i]));
        } else {
            bail!("no probability column for facies '{name}'");
        }
    }
    Ok(ProbabilityField::new(facies)?)
}
