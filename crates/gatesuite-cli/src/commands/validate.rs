//! `gatesuite validate` — Dry-run every topology against the canonical document.

use anyhow::Context;
use clap::Args;
use gatesuite_common::config::SuiteConfig;
use gatesuite_common::constants::COMPOSE_FILE_NAME;
use gatesuite_common::types::{ExampleMode, Topology};
use gatesuite_compose::{ComposeDocument, Feature, GenerationOptions, generate};

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also generate with every optional feature enabled.
    #[arg(long)]
    pub all_features: bool,
}

/// Executes the `validate` command.
///
/// Nothing is written; the command fails on the first topology that
/// cannot be generated.
///
/// # Errors
///
/// Returns an error if a document cannot be loaded or a topology fails.
pub fn execute(args: ValidateArgs, config: &SuiteConfig) -> anyhow::Result<()> {
    let report = validate(config, args.all_features)?;
    println!(
        "{}: {} services, {} topologies OK",
        config.canonical_compose.display(),
        report.services,
        report.topologies
    );
    Ok(())
}

/// Outcome of a successful validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    /// Services in the canonical document.
    pub services: usize,
    /// Topologies generated.
    pub topologies: usize,
}

/// Loads the canonical document and example templates, then generates
/// every topology in memory.
///
/// # Errors
///
/// Returns an error if a document cannot be loaded or a topology fails.
pub fn validate(config: &SuiteConfig, all_features: bool) -> anyhow::Result<Report> {
    let full = ComposeDocument::load(&config.canonical_compose)
        .with_context(|| format!("load {}", config.canonical_compose.display()))?;
    let services = full.require_services()?.len();

    for mode in ExampleMode::ALL {
        let template = config.example_dir.join(mode.as_str()).join(COMPOSE_FILE_NAME);
        let doc = ComposeDocument::load(&template)
            .with_context(|| format!("load template {}", template.display()))?;
        let _ = doc.require_services()?;
    }

    let mut variants = vec![GenerationOptions::from_env()];
    if all_features {
        variants.push(
            GenerationOptions::from_env()
                .with_feature(Feature::DingTalk)
                .with_feature(Feature::Smtp)
                .with_feature(Feature::MailCapture)
                .with_feature(Feature::Totp),
        );
    }
    for opts in &variants {
        let _ = generate(&full, &Topology::ALL, None, opts)?;
    }

    Ok(Report {
        services,
        topologies: Topology::ALL.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CANONICAL: &str = include_str!("../../../../compose/canonical/docker-compose.yml");
    const IMAGE: &str = include_str!("../../../../compose/example/image/docker-compose.yml");

    fn project(canonical: &str) -> (tempfile::TempDir, SuiteConfig) {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = SuiteConfig::at(dir.path());
        fs::create_dir_all(cfg.canonical_compose.parent().expect("parent")).expect("mkdir");
        fs::write(&cfg.canonical_compose, canonical).expect("write");
        for mode in ExampleMode::ALL {
            let d = cfg.example_dir.join(mode.as_str());
            fs::create_dir_all(&d).expect("mkdir");
            fs::write(d.join(COMPOSE_FILE_NAME), IMAGE).expect("write");
        }
        (dir, cfg)
    }

    #[test]
    fn canonical_document_validates() {
        let (_dir, cfg) = project(CANONICAL);
        let report = validate(&cfg, true).expect("validate");
        assert_eq!(report.services, 9);
        assert_eq!(report.topologies, 4);
    }

    #[test]
    fn document_without_services_fails() {
        let (_dir, cfg) = project("networks:\n  a: {}\n");
        assert!(validate(&cfg, false).is_err());
    }
}
