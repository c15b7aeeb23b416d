//! Generation pipeline: one canonical document in, compose files and `.env` out.

use std::collections::BTreeMap;

use gatesuite_common::error::Result;
use gatesuite_common::types::Topology;

use crate::apply::{apply_service_options, apply_traefik_network};
use crate::catalog::{FEATURES, MAIL_CAPTURE_SMTP_ENV};
use crate::document::ComposeDocument;
use crate::env_file::synthesize;
use crate::features::apply_features;
use crate::options::{Feature, GenerationOptions};
use crate::render::render;
use crate::topology::split;
use crate::variables::{VariableTable, extract_variables};
use crate::volumes::apply_redis_storage;

/// Compose text per topology plus one shared `.env`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedArtifacts {
    /// Rendered compose file per requested topology.
    pub composes: BTreeMap<Topology, String>,
    /// `.env` content shared by every topology.
    pub env: String,
}

/// Renders the compose file of one topology.
///
/// Passes run in a fixed order: split, feature removal and injection,
/// per-service options, reverse-proxy network, Redis storage, then
/// rendering. `full` is cloned, never modified.
///
/// # Errors
///
/// Returns an error if the document has no services or cannot be serialized.
pub fn generate_one(full: &ComposeDocument, topology: Topology, opts: &GenerationOptions) -> Result<String> {
    let mut doc = split(full, topology, opts)?;
    apply_features(&mut doc, opts);
    apply_service_options(&mut doc, opts);
    apply_traefik_network(&mut doc, opts);
    apply_redis_storage(&mut doc, &opts.redis_storage);
    let text = render(&doc, topology)?;
    tracing::info!(
        topology = %topology,
        services = doc.service_names().len(),
        bytes = text.len(),
        "generated compose"
    );
    Ok(text)
}

/// Renders every requested topology and the shared `.env`.
///
/// `env_override`, when non-empty, becomes the `.env` verbatim; otherwise
/// the file is synthesized from the variables of `full`. The first failing
/// topology aborts the whole call.
///
/// # Errors
///
/// Returns the first error raised while generating a topology.
pub fn generate(
    full: &ComposeDocument,
    topologies: &[Topology],
    env_override: Option<&str>,
    opts: &GenerationOptions,
) -> Result<GeneratedArtifacts> {
    let mut composes = BTreeMap::new();
    for &topology in topologies {
        let _ = composes.insert(topology, generate_one(full, topology, opts)?);
    }

    let env = match env_override.filter(|text| !text.trim().is_empty()) {
        Some(text) => text.to_owned(),
        None => synthesize(&env_variables(full, opts), None),
    };
    Ok(GeneratedArtifacts { composes, env })
}

/// Variable table of `full` adjusted to the enabled features.
#[must_use]
pub fn env_variables(full: &ComposeDocument, opts: &GenerationOptions) -> VariableTable {
    let mut vars = extract_variables(full);
    for (key, value) in &opts.env_overrides {
        let _ = vars.insert(key.clone(), value.clone());
    }
    for entry in &FEATURES {
        if !opts.has(entry.feature) {
            for key in entry.env_vars {
                let _ = vars.remove(*key);
            }
        }
    }
    if opts.has(Feature::MailCapture) {
        for (key, value) in MAIL_CAPTURE_SMTP_ENV {
            let _ = vars.insert((*key).to_owned(), (*value).to_owned());
        }
    }
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r"
services:
  herald:
    image: ${HERALD_IMAGE:-herald:1}
    environment:
      - LOG_LEVEL=${LOG_LEVEL:-info}
  herald-totp:
    image: ${HERALD_TOTP_IMAGE:-totp:1}
  warden:
    image: ${WARDEN_IMAGE:-warden:1}
";

    fn doc() -> ComposeDocument {
        ComposeDocument::parse(DOC).expect("parse")
    }

    #[test]
    fn generate_returns_requested_topologies_only() {
        let out = generate(
            &doc(),
            &[Topology::Full, Topology::Warden],
            None,
            &GenerationOptions::default(),
        )
        .expect("generate");
        assert_eq!(
            out.composes.keys().copied().collect::<Vec<_>>(),
            vec![Topology::Full, Topology::Warden]
        );
    }

    #[test]
    fn env_override_is_used_verbatim() {
        let out = generate(&doc(), &[Topology::Full], Some("A=1\n"), &GenerationOptions::default())
            .expect("generate");
        assert_eq!(out.env, "A=1\n");
    }

    #[test]
    fn blank_override_falls_back_to_synthesis() {
        let out = generate(&doc(), &[], Some("  \n"), &GenerationOptions::default()).expect("generate");
        assert!(out.env.starts_with("# Container Image / Env - generated from compose"));
        assert!(out.env.contains("HERALD_IMAGE=herald:1"));
    }

    #[test]
    fn disabled_feature_variables_are_dropped() {
        let vars = env_variables(&doc(), &GenerationOptions::default());
        assert!(!vars.contains_key("HERALD_TOTP_IMAGE"));
        let vars = env_variables(&doc(), &GenerationOptions::default().with_feature(Feature::Totp));
        assert_eq!(vars.get("HERALD_TOTP_IMAGE").map(String::as_str), Some("totp:1"));
    }

    #[test]
    fn env_overrides_and_mail_capture_shape_the_table() {
        let opts = GenerationOptions::default()
            .with_env("LOG_LEVEL", "debug")
            .with_feature(Feature::Smtp)
            .with_feature(Feature::MailCapture);
        let vars = env_variables(&doc(), &opts);
        assert_eq!(vars.get("LOG_LEVEL").map(String::as_str), Some("debug"));
        assert_eq!(vars.get("SMTP_HOST").map(String::as_str), Some("owlmail"));
        assert_eq!(vars.get("SMTP_PORT").map(String::as_str), Some("1025"));
    }

    #[test]
    fn missing_services_aborts_generation() {
        let bad = ComposeDocument::parse("volumes:\n  x: {}\n").expect("parse");
        assert!(generate(&bad, &[Topology::Full], None, &GenerationOptions::default()).is_err());
    }
}
