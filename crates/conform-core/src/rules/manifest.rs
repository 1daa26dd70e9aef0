//! Rule manifest: an ordered mapping of rule name to rule definition.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConformError;
use crate::rules::severity::Severity;

/// Ruleset compiled into the binary, used when no `--rules` file is given.
pub const DEFAULT_RULES: &str = include_str!("../../rules/default_rules.json");

/// One manifest entry. Kind-specific fields are ignored by kinds that
/// do not use them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDef {
    pub validator: String,
    #[serde(default)]
    pub catalog: String,
    #[serde(default, alias = "level")]
    pub severity: Severity,
    #[serde(default)]
    pub ext: Vec<String>,
    #[serde(default)]
    pub candidate_path: Option<Vec<String>>,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub assert_in: Option<Vec<String>>,
    #[serde(default)]
    pub accept_folder: bool,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl RuleDef {
    /// An ad-hoc file rule for a path requested on the command line.
    pub fn file(catalog: &str, ext: Vec<String>) -> Self {
        Self {
            validator: "FileValidator".to_string(),
            catalog: catalog.to_string(),
            severity: Severity::default(),
            ext,
            candidate_path: None,
            case_sensitive: false,
            assert_in: None,
            accept_folder: false,
            topics: vec![],
        }
    }

    pub fn candidate_paths(&self) -> Vec<String> {
        self.candidate_path
            .clone()
            .unwrap_or_else(|| vec![".".to_string()])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleManifest {
    rules: Vec<(String, RuleDef)>,
}

impl RuleManifest {
    pub fn from_json(raw: &str) -> Result<Self, ConformError> {
        let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
        let mut rules = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let def: RuleDef =
                serde_json::from_value(value).map_err(|e| ConformError::InvalidRule {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            rules.push((name, def));
        }
        debug!(count = rules.len(), "loaded rule manifest");
        Ok(Self { rules })
    }

    pub fn load(path: &Path) -> Result<Self, ConformError> {
        let raw = fs::read_to_string(path).map_err(|source| ConformError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn embedded() -> Result<Self, ConformError> {
        Self::from_json(DEFAULT_RULES)
    }

    pub fn rules(&self) -> &[(String, RuleDef)] {
        &self.rules
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RuleDef> {
        self.rules
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, def)| def)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.iter().any(|(n, _)| n == name)
    }

    /// Append a rule; an existing rule of the same name is replaced in place.
    pub fn insert(&mut self, name: impl Into<String>, def: RuleDef) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(existing) => *existing = def,
            None => self.rules.push((name, def)),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl IntoIterator for RuleManifest {
    type Item = (String, RuleDef);
    type IntoIter = std::vec::IntoIter<(String, RuleDef)>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

/// Give every extension its leading dot and make `.yml`/`.yaml` imply
/// each other. `""` stays as "no extension". Order is kept.
pub fn normalize_extensions(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |ext: String| {
        if !out.contains(&ext) {
            out.push(ext);
        }
    };
    for ext in raw {
        let ext = ext.trim();
        let ext = if ext.is_empty() || ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{ext}")
        };
        match ext.to_ascii_lowercase().as_str() {
            ".yml" => {
                push(ext);
                push(".yaml".to_string());
            }
            ".yaml" => {
                push(ext);
                push(".yml".to_string());
            }
            _ => push(ext),
        }
    }
    out
}
