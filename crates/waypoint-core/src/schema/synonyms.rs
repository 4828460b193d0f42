//! Synonym tables for enum canonicalization.
//!
//! Tables are configuration data, not logic: the built-in table is embedded
//! from `schemas/synonyms.yaml` and deployments may load their own. They are
//! never assumed exhaustive; the sanitizer maps anything unrecognized to the
//! schema default.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

use crate::normalize::patterns::normalize_token;

const BUILTIN_SYNONYMS_YAML: &str = include_str!("../../../../schemas/synonyms.yaml");

static BUILTIN: OnceLock<SynonymTables> = OnceLock::new();

/// Errors from loading synonym tables.
#[derive(Error, Debug)]
pub enum SynonymError {
    #[error("Failed to read synonym file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse synonym YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Ambiguous synonym '{token}' in {schema}.{field}: maps to both '{first}' and '{second}'")]
    Ambiguous {
        schema: String,
        field: String,
        token: String,
        first: String,
        second: String,
    },
}

/// schema -> field -> canonical value -> synonyms
type RawTables = BTreeMap<String, BTreeMap<String, BTreeMap<String, Vec<String>>>>;

/// Lookup tables mapping drifted enum values to canonical ones.
#[derive(Debug, Clone, Default)]
pub struct SynonymTables {
    raw: RawTables,
    /// (schema, field) -> normalized token -> canonical value
    index: HashMap<(String, String), HashMap<String, String>>,
}

impl SynonymTables {
    /// The embedded default tables.
    ///
    /// If the embedded YAML fails to load (a build defect), the error is
    /// logged and empty tables are returned, so every drifted value degrades
    /// to its schema default instead of panicking.
    pub fn builtin() -> Self {
        BUILTIN
            .get_or_init(|| {
                Self::from_yaml(BUILTIN_SYNONYMS_YAML).unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Embedded synonym table is invalid");
                    Self::default()
                })
            })
            .clone()
    }

    /// Parse tables from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SynonymError> {
        let raw: RawTables = serde_yaml::from_str(yaml)?;
        Self::from_raw(raw)
    }

    /// Parse tables from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, SynonymError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    fn from_raw(raw: RawTables) -> Result<Self, SynonymError> {
        let mut index: HashMap<(String, String), HashMap<String, String>> = HashMap::new();

        for (schema, fields) in &raw {
            for (field, canonicals) in fields {
                let entry = index.entry((schema.clone(), field.clone())).or_default();
                for (canonical, synonyms) in canonicals {
                    // A canonical value is always its own synonym.
                    let tokens = std::iter::once(canonical).chain(synonyms.iter());
                    for token in tokens.map(|t| normalize_token(t)) {
                        if token.is_empty() {
                            continue;
                        }
                        match entry.get(&token) {
                            Some(existing) if existing != canonical => {
                                return Err(SynonymError::Ambiguous {
                                    schema: schema.clone(),
                                    field: field.clone(),
                                    token,
                                    first: existing.clone(),
                                    second: canonical.clone(),
                                });
                            }
                            _ => {
                                entry.insert(token, canonical.clone());
                            }
                        }
                    }
                }
            }
        }

        Ok(Self { raw, index })
    }

    /// Layer `overrides` on top of these tables.
    ///
    /// Fields named in `overrides` replace the same fields here; other fields
    /// are kept.
    pub fn merge(self, overrides: SynonymTables) -> Result<Self, SynonymError> {
        let mut raw = self.raw;
        for (schema, fields) in overrides.raw {
            let target = raw.entry(schema).or_default();
            for (field, canonicals) in fields {
                target.insert(field, canonicals);
            }
        }
        Self::from_raw(raw)
    }

    /// Find the canonical value for a raw token.
    ///
    /// `raw` is normalized before lookup.
    pub fn lookup(&self, schema: &str, field: &str, raw: &str) -> Option<&str> {
        self.index
            .get(&(schema.to_string(), field.to_string()))
            .and_then(|tokens| tokens.get(&normalize_token(raw)))
            .map(String::as_str)
    }

    /// Whether any table exists for a field.
    pub fn has_field(&self, schema: &str, field: &str) -> bool {
        self.index
            .contains_key(&(schema.to_string(), field.to_string()))
    }

    /// Every (synonym, canonical) pair declared for a field.
    pub fn pairs(&self, schema: &str, field: &str) -> Vec<(String, String)> {
        self.raw
            .get(schema)
            .and_then(|fields| fields.get(field))
            .map(|canonicals| {
                canonicals
                    .iter()
                    .flat_map(|(canonical, synonyms)| {
                        synonyms
                            .iter()
                            .map(move |s| (s.clone(), canonical.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Serialized form is the raw table, so loaded tables can be dumped back.
impl Serialize for SynonymTables {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SynonymTables {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTables::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_loads() {
        let tables = SynonymTables::builtin();
        assert!(tables.has_field("roadmap_modules", "difficulty"));
        assert!(tables.has_field("roadmap_modules", "status"));
        assert!(tables.has_field("quiz_questions", "difficulty"));
        assert!(tables.has_field("lesson", "content_type"));
    }

    #[test]
    fn test_lookup_examples() {
        let tables = SynonymTables::builtin();
        assert_eq!(tables.lookup("roadmap_modules", "difficulty", "medium"), Some("Med"));
        assert_eq!(tables.lookup("roadmap_modules", "difficulty", "Low-Medium"), Some("Low-Med"));
        assert_eq!(tables.lookup("roadmap_modules", "status", "complete"), Some("completed"));
        assert_eq!(tables.lookup("roadmap_modules", "status", "In Progress"), Some("in_progress"));
        assert_eq!(tables.lookup("roadmap_modules", "difficulty", "legendary"), None);
    }

    #[test]
    fn test_canonical_is_own_synonym() {
        let tables = SynonymTables::from_yaml("s:\n  f:\n    Alpha: [a]\n").unwrap();
        assert_eq!(tables.lookup("s", "f", "alpha"), Some("Alpha"));
        assert_eq!(tables.lookup("s", "f", "A"), Some("Alpha"));
    }

    #[test]
    fn test_ambiguous_table_rejected() {
        let yaml = "s:\n  f:\n    Alpha: [x]\n    Beta: [X]\n";
        let result = SynonymTables::from_yaml(yaml);
        assert!(matches!(result, Err(SynonymError::Ambiguous { .. })));
    }

    #[test]
    fn test_merge_replaces_named_fields_only() {
        let base = SynonymTables::builtin();
        let overrides =
            SynonymTables::from_yaml("roadmap_modules:\n  difficulty:\n    High: [brutal]\n").unwrap();
        let merged = base.merge(overrides).unwrap();

        assert_eq!(merged.lookup("roadmap_modules", "difficulty", "brutal"), Some("High"));
        // Replaced field no longer knows the old synonyms.
        assert_eq!(merged.lookup("roadmap_modules", "difficulty", "medium"), None);
        // Untouched field keeps its table.
        assert_eq!(merged.lookup("roadmap_modules", "status", "done"), Some("completed"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = SynonymTables::from_yaml_file("/nonexistent/waypoint/synonyms.yaml");
        assert!(matches!(result, Err(SynonymError::IoError(_))));
    }

    #[test]
    fn test_pairs_lists_declared_synonyms() {
        let tables = SynonymTables::builtin();
        let pairs = tables.pairs("roadmap_modules", "difficulty");
        assert!(pairs.contains(&("low-medium".to_string(), "Low-Med".to_string())));
    }
}
