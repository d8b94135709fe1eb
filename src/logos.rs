//! Operator name to logo asset lookup.
//!
//! Joint operators are written as `"A/B"` and resolve to up to two logos.
//! Names missing from the table resolve to no logo, never an error.

use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::Result;

const MAX_LOGOS: usize = 2;

static EMBEDDED: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    serde_json::from_str(include_str!("../config/operator_logos.json"))
        .expect("embedded operator logo table is valid JSON")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Logo {
    pub operator: String,
    pub asset: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoTable {
    entries: BTreeMap<String, String>,
}

impl Default for LogoTable {
    fn default() -> Self {
        Self {
            entries: EMBEDDED.clone(),
        }
    }
}

impl LogoTable {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    /// Load a JSON object of `operator -> asset path`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_str(&fs::read_to_string(path)?)?;
        debug!("Loaded {} operator logos from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn insert(&mut self, operator: &str, asset: &str) {
        self.entries.insert(operator.to_string(), asset.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, name: &str) -> Option<&String> {
        self.entries.get(name).or_else(|| {
            self.entries
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Zero, one or two logos for an operator string.
    pub fn resolve(&self, operator: Option<&str>) -> Vec<Logo> {
        let Some(operator) = operator else {
            return Vec::new();
        };
        operator
            .split('/')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .take(MAX_LOGOS)
            .filter_map(|name| match self.lookup(name) {
                Some(asset) => Some(Logo {
                    operator: name.to_string(),
                    asset: asset.clone(),
                }),
                None => {
                    debug!("No logo for operator '{}'", name);
                    None
                }
            })
            .collect()
    }
}
