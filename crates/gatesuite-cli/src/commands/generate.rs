//! `gatesuite gen` / `gatesuite gen-split` — Write compose files and `.env` per mode.

use std::fs;
use std::path::Path;

use anyhow::Context;
use clap::Args;
use gatesuite_common::config::SuiteConfig;
use gatesuite_common::constants::{BUILD_DIR, COMPOSE_FILE_NAME, ENV_FILE_NAME};
use gatesuite_common::types::{GenMode, Topology};
use gatesuite_compose::env_file::default_env_body;
use gatesuite_compose::{ComposeDocument, GenerationOptions, generate};

/// Arguments for the `gen` command.
#[derive(Args, Debug)]
pub struct GenArgs {
    /// image, build, traefik, traefik-herald, traefik-warden, traefik-stargate, or all.
    #[arg(default_value = "all")]
    pub mode: String,

    /// Output directory, relative to the project root.
    #[arg(short, long, env = "GEN_OUT_DIR", default_value = BUILD_DIR)]
    pub out: String,
}

/// Arguments for the `gen-split` command.
#[derive(Args, Debug)]
pub struct GenSplitArgs {
    /// Output directory, relative to the project root.
    #[arg(short, long, env = "GEN_OUT_DIR", default_value = BUILD_DIR)]
    pub out: String,
}

/// Executes the `gen` command.
///
/// # Errors
///
/// Returns an error if the mode is unknown, a source file cannot be read,
/// generation fails, or an artifact cannot be written.
pub fn execute(args: GenArgs, config: &SuiteConfig) -> anyhow::Result<()> {
    let mode: GenMode = args.mode.parse()?;
    let out_dir = config.out_dir(&args.out);
    let written = write_mode(config, &out_dir, &mode, &GenerationOptions::from_env())?;
    println!("Generated {} for mode(s): {}", out_dir.display(), written.join(", "));
    Ok(())
}

/// Executes the `gen-split` command.
///
/// # Errors
///
/// Returns an error if the canonical document cannot be loaded or an
/// artifact cannot be written.
pub fn execute_split(args: GenSplitArgs, config: &SuiteConfig) -> anyhow::Result<()> {
    let mode = GenMode {
        examples: Vec::new(),
        topologies: Topology::SLICES.to_vec(),
    };
    let out_dir = config.out_dir(&args.out);
    let written = write_mode(config, &out_dir, &mode, &GenerationOptions::from_env())?;
    println!(
        "gen-split: {} -> {}",
        config.canonical_compose.display(),
        written.join(", ")
    );
    Ok(())
}

/// Writes `<out_dir>/<name>/{docker-compose.yml,.env}` for every entry of
/// `mode` and returns the names written.
///
/// A non-blank root `.env` is used verbatim for every mode. Without one,
/// example modes get the baseline body and topologies a synthesized file.
///
/// # Errors
///
/// Returns an error on any read, generation, or write failure.
pub fn write_mode(
    config: &SuiteConfig,
    out_dir: &Path,
    mode: &GenMode,
    opts: &GenerationOptions,
) -> anyhow::Result<Vec<&'static str>> {
    let env_override = read_env_override(&config.env_file)?;

    for example in &mode.examples {
        let template = config.example_dir.join(example.as_str()).join(COMPOSE_FILE_NAME);
        let compose = fs::read_to_string(&template)
            .with_context(|| format!("read template {}", template.display()))?;
        let env = env_override.as_deref().unwrap_or(default_env_body());
        write_artifact(out_dir, example.as_str(), &compose, env)?;
    }

    if !mode.topologies.is_empty() {
        let full = ComposeDocument::load(&config.canonical_compose)
            .with_context(|| format!("load {}", config.canonical_compose.display()))?;
        let artifacts = generate(&full, &mode.topologies, env_override.as_deref(), opts)?;
        for (topology, compose) in &artifacts.composes {
            write_artifact(out_dir, topology.as_str(), compose, &artifacts.env)?;
        }
    }

    Ok(mode.names())
}

fn read_env_override(path: &Path) -> anyhow::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) if !text.trim().is_empty() => Ok(Some(text)),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
    }
}

fn write_artifact(out_dir: &Path, name: &str, compose: &str, env: &str) -> anyhow::Result<()> {
    let dir = out_dir.join(name);
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let compose_path = dir.join(COMPOSE_FILE_NAME);
    fs::write(&compose_path, compose).with_context(|| format!("write {}", compose_path.display()))?;
    let env_path = dir.join(ENV_FILE_NAME);
    fs::write(&env_path, env).with_context(|| format!("write {}", env_path.display()))?;
    tracing::debug!(dir = %dir.display(), "wrote artifacts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatesuite_common::types::ExampleMode;

    const CANONICAL: &str = include_str!("../../../../compose/canonical/docker-compose.yml");
    const IMAGE: &str = include_str!("../../../../compose/example/image/docker-compose.yml");
    const BUILD: &str = include_str!("../../../../compose/example/build/docker-compose.yml");

    fn project() -> (tempfile::TempDir, SuiteConfig) {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = SuiteConfig::at(dir.path());
        fs::create_dir_all(cfg.canonical_compose.parent().expect("parent")).expect("mkdir");
        fs::write(&cfg.canonical_compose, CANONICAL).expect("write canonical");
        for (mode, text) in [(ExampleMode::Image, IMAGE), (ExampleMode::Build, BUILD)] {
            let d = cfg.example_dir.join(mode.as_str());
            fs::create_dir_all(&d).expect("mkdir");
            fs::write(d.join(COMPOSE_FILE_NAME), text).expect("write template");
        }
        (dir, cfg)
    }

    #[test]
    fn all_mode_writes_every_directory() {
        let (_dir, cfg) = project();
        let out = cfg.out_dir("build");
        let names = write_mode(&cfg, &out, &GenMode::all(), &GenerationOptions::default()).expect("gen");
        assert_eq!(names.len(), 6);
        for name in names {
            assert!(out.join(name).join(COMPOSE_FILE_NAME).is_file(), "{name} compose");
            assert!(out.join(name).join(ENV_FILE_NAME).is_file(), "{name} env");
        }
    }

    #[test]
    fn example_modes_copy_templates_and_baseline_env() {
        let (_dir, cfg) = project();
        let out = cfg.out_dir("build");
        let mode: GenMode = "image".parse().expect("mode");
        let _ = write_mode(&cfg, &out, &mode, &GenerationOptions::default()).expect("gen");
        let compose = fs::read_to_string(out.join("image").join(COMPOSE_FILE_NAME)).expect("read");
        assert_eq!(compose, IMAGE);
        let env = fs::read_to_string(out.join("image").join(ENV_FILE_NAME)).expect("read");
        assert_eq!(env, default_env_body());
        assert!(!out.join("traefik").exists());
    }

    #[test]
    fn root_env_is_used_verbatim() {
        let (_dir, cfg) = project();
        fs::write(&cfg.env_file, "LOG_LEVEL=debug\n").expect("write env");
        let out = cfg.out_dir("dist");
        let mode: GenMode = "traefik-warden".parse().expect("mode");
        let _ = write_mode(&cfg, &out, &mode, &GenerationOptions::default()).expect("gen");
        let env = fs::read_to_string(out.join("traefik-warden").join(ENV_FILE_NAME)).expect("read");
        assert_eq!(env, "LOG_LEVEL=debug\n");
    }

    #[test]
    fn topologies_without_root_env_get_synthesized_env() {
        let (_dir, cfg) = project();
        let out = cfg.out_dir("build");
        let mode = GenMode {
            examples: Vec::new(),
            topologies: Topology::SLICES.to_vec(),
        };
        let names = write_mode(&cfg, &out, &mode, &GenerationOptions::default()).expect("gen");
        assert_eq!(names, vec!["traefik-herald", "traefik-warden", "traefik-stargate"]);
        let env = fs::read_to_string(out.join("traefik-herald").join(ENV_FILE_NAME)).expect("read");
        assert!(env.contains("HERALD_IMAGE="));
        assert!(!out.join("traefik").exists());
    }

    #[test]
    fn missing_canonical_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = SuiteConfig::at(dir.path());
        let mode: GenMode = "traefik".parse().expect("mode");
        let err = write_mode(&cfg, &cfg.out_dir(""), &mode, &GenerationOptions::default()).unwrap_err();
        assert!(err.to_string().contains("load"), "got: {err}");
    }
}
