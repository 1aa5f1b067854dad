//! Zone facies catalog and the rule→zone ordering.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A modelled facies: unique name and global code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Facies {
    pub name: String,
    pub code: i32,
}

impl Facies {
    pub fn new(name: impl Into<String>, code: i32) -> Self {
        Self {
            name: name.into(),
            code,
        }
    }
}

/// Ordered facies of one zone. Probability vectors are indexed in this order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Facies>", into = "Vec<Facies>")]
pub struct FaciesCatalog {
    facies: Vec<Facies>,
}

impl FaciesCatalog {
    /// Reject duplicate names and duplicate codes.
    pub fn new(facies: Vec<Facies>) -> Result<Self, ConfigError> {
        let mut names = HashSet::with_capacity(facies.len());
        let mut codes = HashSet::with_capacity(facies.len());
        for f in &facies {
            if !names.insert(f.name.as_str()) {
                return Err(ConfigError::DuplicateFacies(f.name.clone()));
            }
            if !codes.insert(f.code) {
                return Err(ConfigError::DuplicateCode(f.code));
            }
        }
        Ok(Self { facies })
    }

    /// Convenience constructor from `(name, code)` pairs.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, i32)>,
    ) -> Result<Self, ConfigError> {
        Self::new(pairs.into_iter().map(|(n, c)| Facies::new(n, c)).collect())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.facies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.facies.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Facies> {
        self.facies.get(index)
    }

    /// Global code of the facies at zone position `index`. Panics if out of range.
    #[inline]
    pub fn code(&self, index: usize) -> i32 {
        self.facies[index].code
    }

    #[inline]
    pub fn name(&self, index: usize) -> &str {
        &self.facies[index].name
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.facies.iter().position(|f| f.name == name)
    }

    /// Zone index of `name`, or `UnknownFacies`.
    pub fn require(&self, name: &str) -> Result<usize, ConfigError> {
        self.index_of(name)
            .ok_or_else(|| ConfigError::UnknownFacies(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Facies> {
        self.facies.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.facies.iter().map(|f| f.name.clone()).collect()
    }

    /// Ordering from the rule's facies list (first-appearance order) into this
    /// zone. The two sets must be equal.
    pub fn ordering(&self, rule_facies: &[String]) -> Result<FaciesOrdering, ConfigError> {
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(rule_facies.len());
        let mut rule_to_zone = Vec::with_capacity(rule_facies.len());
        for name in rule_facies {
            if seen.contains_key(name.as_str()) {
                return Err(ConfigError::DuplicateFacies(name.clone()));
            }
            let zone_idx = self.index_of(name).ok_or_else(|| ConfigError::FaciesSetMismatch {
                rule: rule_facies.to_vec(),
                zone: self.names(),
            })?;
            seen.insert(name.as_str(), zone_idx);
            rule_to_zone.push(zone_idx);
        }
        if rule_to_zone.len() != self.len() {
            return Err(ConfigError::FaciesSetMismatch {
                rule: rule_facies.to_vec(),
                zone: self.names(),
            });
        }
        Ok(FaciesOrdering { rule_to_zone })
    }
}

impl TryFrom<Vec<Facies>> for FaciesCatalog {
    type Error = ConfigError;

    fn try_from(facies: Vec<Facies>) -> Result<Self, Self::Error> {
        Self::new(facies)
    }
}

impl From<FaciesCatalog> for Vec<Facies> {
    fn from(c: FaciesCatalog) -> Self {
        c.facies
    }
}

/// Bijection between a rule's facies order and the zone's facies order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaciesOrdering {
    rule_to_zone: Vec<usize>,
}

impl FaciesOrdering {
    #[inline]
    pub fn zone_index(&self, rule_pos: usize) -> usize {
        self.rule_to_zone[rule_pos]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rule_to_zone.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rule_to_zone.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> FaciesCatalog {
        FaciesCatalog::from_pairs([("F1", 1), ("F2", 2), ("F3", 3)]).unwrap()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn catalog_rejects_duplicates() {
        assert_eq!(
            FaciesCatalog::from_pairs([("A", 1), ("A", 2)]),
            Err(ConfigError::DuplicateFacies("A".into()))
        );
        assert_eq!(
            FaciesCatalog::from_pairs([("A", 1), ("B", 1)]),
            Err(ConfigError::DuplicateCode(1))
        );
    }

    #[test]
    fn ordering_maps_rule_positions_to_zone() {
        let z = zone();
        let ord = z.ordering(&names(&["F3", "F1", "F2"])).unwrap();
        assert_eq!(ord.zone_index(0), 2);
        assert_eq!(ord.zone_index(1), 0);
        assert_eq!(ord.zone_index(2), 1);
        assert_eq!(z.code(ord.zone_index(0)), 3);
    }

    #[test]
    fn ordering_requires_equal_sets() {
        let z = zone();
        assert!(matches!(
            z.ordering(&names(&["F1", "F2"])),
            Err(ConfigError::FaciesSetMismatch { .. })
        ));
        assert!(matches!(
            z.ordering(&names(&["F1", "F2", "F4"])),
            Err(ConfigError::FaciesSetMismatch { .. })
        ));
        assert_eq!(
            z.ordering(&names(&["F1", "F1", "F2"])),
            Err(ConfigError::DuplicateFacies("F1".into()))
        );
    }

    #[test]
    fn catalog_deserializes_with_validation() {
        let ok: FaciesCatalog =
            serde_json::from_str(r#"[{"name":"A","code":1},{"name":"B","code":5}]"#).unwrap();
        assert_eq!(ok.require("B"), Ok(1));
        let dup = r#"[{"name":"A","code":1},{"name":"A","code":2}]"#;
        let bad = serde_json::from_str::<FaciesCatalog>(dup);
        assert!(bad.is_err());
    }
}
