//! Model files: a zone's facies catalog plus its truncation rule, as JSON.

use anyhow::{Context, Result};
use plurigauss::api::{EngineCfg, FaciesCatalog, Rule, RuleCfg, RuleSpec};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Deserialize)]
pub struct ModelFile {
    pub facies: FaciesCatalog,
    pub rule: RuleSpec,
    #[serde(default)]
    pub rule_cfg: RuleCfg,
    #[serde(default)]
    pub engine: EngineCfg,
}

impl ModelFile {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading model {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parsing model {}", path.display()))
    }

    /// Validated rule for the model's zone.
    pub fn rule(&self) -> Result<Rule> {
        Rule::configure(&self.rule, &self.facies, self.rule_cfg)
            .with_context(|| format!("configuring {} rule", self.rule.kind()))
    }
}
