use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};

/// Metadata used to generate a provenance sidecar.
pub struct Payload {
    pub command: &'static str,
    pub params: Value,
    /// Model file the artifact was derived from.
    pub model: Option<PathBuf>,
}

impl Payload {
    pub fn new(command: &'static str, params: Value) -> Self {
        Self {
            command,
            params,
            model: None,
        }
    }

    pub fn with_model(mut self, model: &Path) -> Self {
        self.model = Some(model.to_path_buf());
        self
    }
}

/// Write `<artifact>.provenance.json` with the code revision, library version,
/// callsite, command parameters and outputs.
#[track_caller]
pub fn write_sidecar<P: AsRef<Path>>(artifact: P, payload: Payload) -> Result<PathBuf> {
    let artifact = artifact.as_ref();
    let provenance_path = provenance_path(artifact);
    if let Some(parent) = provenance_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating provenance dir {}", parent.display()))?;
        }
    }

    let callsite = Location::caller();
    let doc = json!({
        "code_rev": code_rev(),
        "version": plurigauss::VERSION,
        "callsite": {
            "file": callsite.file(),
            "line": callsite.line()
        },
        "command": payload.command,
        "model": payload.model.as_deref().map(|m| m.to_string_lossy().into_owned()),
        "params": payload.params,
        "outputs": [artifact.to_string_lossy()]
    });
    fs::write(&provenance_path, serde_json::to_vec_pretty(&doc)?)
        .with_context(|| format!("writing {}", provenance_path.display()))?;
    tracing::debug!(path = %provenance_path.display(), "wrote provenance");
    Ok(provenance_path)
}

/// `<stem>.provenance.json` next to the artifact.
fn provenance_path(artifact: &Path) -> PathBuf {
    artifact.with_extension("provenance.json")
}

/// `GIT_COMMIT` as seen at build time, else at run time, else "unknown".
pub fn code_rev() -> String {
    option_env!("GIT_COMMIT")
        .filter(|rev| !rev.is_empty())
        .map(str::to_owned)
        .or_else(|| std::env::var("GIT_COMMIT").ok().filter(|rev| !rev.is_empty()))
        .unwrap_or_else(|| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn provenance_path_replaces_extension() {
        let base = Path::new("/tmp/output/polygons.csv");
        let derived = provenance_path(base);
        assert_eq!(derived, Path::new("/tmp/output/polygons.provenance.json"));
        let bare = provenance_path(Path::new("out/facies"));
        assert_eq!(bare, Path::new("out/facies.provenance.json"));
    }

    #[test]
    fn code_rev_is_never_empty() {
        assert!(!code_rev().is_empty());
    }

    #[test]
    fn sidecar_records_command_model_and_outputs() {
        let dir = tempdir().unwrap();
        let artifact = dir.path().join("facies.csv");
        fs::write(&artifact, "cell,code\n").unwrap();
        let payload =
            Payload::new("evaluate", json!({ "cells": 0 })).with_model(Path::new("zone.json"));
        let prov_path = write_sidecar(&artifact, payload).unwrap();
        assert!(prov_path.exists());
        let parsed: Value = serde_json::from_slice(&fs::read(prov_path).unwrap()).unwrap();
        assert_eq!(parsed["outputs"][0], artifact.to_string_lossy().as_ref());
        assert_eq!(parsed["command"], "evaluate");
        assert_eq!(parsed["model"], "zone.json");
        assert_eq!(parsed["version"], plurigauss::VERSION);
    }
}
