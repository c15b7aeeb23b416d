//! In-memory compose document.
//!
//! A compose file is loosely typed YAML, so the document is kept as a
//! [`serde_yaml::Value`] tree. Accessors fail soft: a section or field with
//! an unexpected shape reads as absent instead of raising an error.
//!
//! Map-shaped `environment` and `labels` blocks are rewritten to
//! `KEY=VALUE` lists once, at load time, so every later pass only has to
//! handle the list shape.

use std::path::Path;

use gatesuite_common::error::{Result, SuiteError};
use serde_yaml::{Mapping, Value};

/// Top-level key holding service definitions.
pub const SERVICES: &str = "services";
/// Top-level key holding named volume declarations.
pub const VOLUMES: &str = "volumes";
/// Top-level key holding network declarations.
pub const NETWORKS: &str = "networks";

/// A parsed compose document with a mapping at its root.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeDocument {
    root: Mapping,
}

impl ComposeDocument {
    /// Parses compose YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::Parse`] if the text is not valid YAML or its
    /// root is not a non-empty mapping.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| SuiteError::Parse {
            message: e.to_string(),
        })?;
        match value {
            Value::Mapping(root) if !root.is_empty() => {
                let mut doc = Self { root };
                doc.normalize();
                Ok(doc)
            }
            _ => Err(SuiteError::Parse {
                message: "empty or invalid structure".into(),
            }),
        }
    }

    /// Parses compose YAML bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::Parse`] if the bytes are not UTF-8 YAML with a
    /// non-empty mapping at the root.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| SuiteError::Parse {
            message: e.to_string(),
        })?;
        Self::parse(text)
    }

    /// Reads and parses a compose file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| SuiteError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_slice(&bytes)
    }

    pub(crate) const fn from_mapping(root: Mapping) -> Self {
        Self { root }
    }

    /// Returns the root mapping.
    #[must_use]
    pub const fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    /// Returns a top-level section if it is a mapping.
    #[must_use]
    pub fn section(&self, key: &str) -> Option<&Mapping> {
        self.root.get(key).and_then(Value::as_mapping)
    }

    pub(crate) fn section_mut(&mut self, key: &str) -> Option<&mut Mapping> {
        self.root.get_mut(key).and_then(Value::as_mapping_mut)
    }

    pub(crate) fn set_section(&mut self, key: &str, section: Mapping) {
        let _ = self.root.insert(key.into(), Value::Mapping(section));
    }

    pub(crate) fn remove_section(&mut self, key: &str) {
        let _ = self.root.remove(key);
    }

    /// Returns the `services` section.
    #[must_use]
    pub fn services(&self) -> Option<&Mapping> {
        self.section(SERVICES)
    }

    pub(crate) fn services_mut(&mut self) -> Option<&mut Mapping> {
        self.section_mut(SERVICES)
    }

    /// Returns the `services` section, requiring it to be present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::MissingServices`] otherwise.
    pub fn require_services(&self) -> Result<&Mapping> {
        self.services()
            .filter(|s| !s.is_empty())
            .ok_or(SuiteError::MissingServices)
    }

    /// Returns one service definition if it is a mapping.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Mapping> {
        self.services()?.get(name).and_then(Value::as_mapping)
    }

    pub(crate) fn service_mut(&mut self, name: &str) -> Option<&mut Mapping> {
        self.services_mut()?
            .get_mut(name)
            .and_then(Value::as_mapping_mut)
    }

    /// Returns service names in sorted order.
    #[must_use]
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services()
            .map(|s| s.keys().filter_map(scalar_to_string).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Returns the `volumes` section.
    #[must_use]
    pub fn volumes(&self) -> Option<&Mapping> {
        self.section(VOLUMES)
    }

    /// Returns the `networks` section.
    #[must_use]
    pub fn networks(&self) -> Option<&Mapping> {
        self.section(NETWORKS)
    }

    /// Serializes the document with every mapping's keys sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if YAML serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        let sorted = sorted_value(&Value::Mapping(self.root.clone()));
        Ok(serde_yaml::to_string(&sorted)?)
    }

    fn normalize(&mut self) {
        let Some(services) = self.services_mut() else {
            return;
        };
        for (_, svc) in services.iter_mut() {
            let Some(svc) = svc.as_mapping_mut() else {
                continue;
            };
            for key in ["environment", "labels"] {
                if let Some(Value::Mapping(map)) = svc.get(key) {
                    let list = assignments_from_map(map);
                    let _ = svc.insert(key.into(), Value::Sequence(list));
                }
            }
        }
    }
}

/// Converts a `KEY: value` mapping into `KEY=value` list entries.
/// A null value yields a bare `KEY`.
fn assignments_from_map(map: &Mapping) -> Vec<Value> {
    map.iter()
        .filter_map(|(k, v)| {
            let key = scalar_to_string(k)?;
            Some(match scalar_to_string(v) {
                Some(val) => Value::String(format!("{key}={val}")),
                None => Value::String(key),
            })
        })
        .collect()
}

/// Renders a scalar YAML value as text; non-scalars and null yield `None`.
#[must_use]
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Returns the string entries of a list field, or `None` if the field is
/// absent or not a sequence. Non-string scalars are rendered as text.
pub(crate) fn string_list(svc: &Mapping, key: &str) -> Option<Vec<String>> {
    let seq = svc.get(key)?.as_sequence()?;
    Some(seq.iter().filter_map(scalar_to_string).collect())
}

pub(crate) fn set_string_list(svc: &mut Mapping, key: &str, items: Vec<String>) {
    let seq = items.into_iter().map(Value::String).collect();
    let _ = svc.insert(key.into(), Value::Sequence(seq));
}

/// Returns the key of a `KEY=VALUE` assignment, trimmed.
pub(crate) fn assignment_key(entry: &str) -> &str {
    entry.split_once('=').map_or(entry, |(k, _)| k).trim()
}

fn sorted_value(value: &Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut entries: Vec<(&Value, &Value)> = map.iter().collect();
            entries.sort_by_key(|(k, _)| scalar_to_string(k).unwrap_or_default());
            Value::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted_value(v)))
                    .collect(),
            )
        }
        Value::Sequence(seq) => Value::Sequence(seq.iter().map(sorted_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_invalid_yaml() {
        let err = ComposeDocument::parse("services: [unclosed").unwrap_err();
        assert!(matches!(err, SuiteError::Parse { .. }));
    }

    #[test]
    fn parse_rejects_non_mapping_root() {
        assert!(ComposeDocument::parse("- a\n- b\n").is_err());
        assert!(ComposeDocument::parse("").is_err());
        assert!(ComposeDocument::parse("{}").is_err());
    }

    #[test]
    fn require_services_fails_when_absent() {
        let doc = ComposeDocument::parse("volumes:\n  data: {}\n").expect("parse");
        assert!(matches!(
            doc.require_services(),
            Err(SuiteError::MissingServices)
        ));
    }

    #[test]
    fn require_services_fails_when_empty() {
        let doc = ComposeDocument::parse("services: {}\n").expect("parse");
        assert!(doc.require_services().is_err());
    }

    #[test]
    fn map_environment_is_normalized_to_list() {
        let doc = ComposeDocument::parse(
            "services:\n  a:\n    environment:\n      PORT: 8080\n      DEBUG: true\n      EMPTY:\n",
        )
        .expect("parse");
        let svc = doc.service("a").expect("service a");
        let env = string_list(svc, "environment").expect("environment list");
        assert_eq!(env, vec!["PORT=8080", "DEBUG=true", "EMPTY"]);
    }

    #[test]
    fn map_labels_are_normalized_to_list() {
        let doc = ComposeDocument::parse(
            "services:\n  a:\n    labels:\n      traefik.enable: \"true\"\n",
        )
        .expect("parse");
        let labels = string_list(doc.service("a").expect("a"), "labels").expect("labels");
        assert_eq!(labels, vec!["traefik.enable=true"]);
    }

    #[test]
    fn service_names_are_sorted() {
        let doc = ComposeDocument::parse("services:\n  zeta: {}\n  alpha: {}\n").expect("parse");
        assert_eq!(doc.service_names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn to_yaml_sorts_keys_but_keeps_sequence_order() {
        let doc = ComposeDocument::parse(
            "services:\n  b:\n    ports: [\"2:2\", \"1:1\"]\n    image: x\n  a:\n    image: y\n",
        )
        .expect("parse");
        let text = doc.to_yaml().expect("yaml");
        let a = text.find("  a:").expect("a");
        let b = text.find("  b:").expect("b");
        assert!(a < b, "services not sorted:\n{text}");
        let image = text.find("image: x").expect("image");
        let ports = text.find("ports:").expect("ports");
        assert!(image < ports, "service keys not sorted:\n{text}");
        assert!(text.find("2:2").expect("2:2") < text.find("1:1").expect("1:1"));
    }

    #[test]
    fn assignment_key_trims_and_handles_bare_keys() {
        assert_eq!(assignment_key(" KEY =value"), "KEY");
        assert_eq!(assignment_key("BARE"), "BARE");
        assert_eq!(assignment_key("A=b=c"), "A");
    }

    #[test]
    fn load_reports_missing_file_as_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ComposeDocument::load(&dir.path().join("missing.yml")).unwrap_err();
        assert!(matches!(err, SuiteError::Io { .. }));
    }
}
