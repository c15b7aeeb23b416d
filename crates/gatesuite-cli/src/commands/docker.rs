//! `gatesuite up|down|ps|logs|restart|net-split` — Drive generated stacks with `docker compose`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, bail};
use clap::Args;
use gatesuite_common::config::SuiteConfig;
use gatesuite_common::constants::{BUILD_DIR, COMPOSE_FILE_NAME, DEFAULT_TRAEFIK_NETWORK, SHARED_NETWORK};
use gatesuite_common::error::SuiteError;
use gatesuite_common::types::{ExampleMode, Topology};

/// Selects which generated stack a command targets.
#[derive(Args, Debug)]
pub struct ModeArgs {
    /// Generated mode directory (image, build, traefik, traefik-herald, ...).
    #[arg(short, long, default_value = "traefik")]
    pub mode: String,

    /// Directory holding the generated modes, relative to the project root.
    #[arg(short, long, env = "GEN_OUT_DIR", default_value = BUILD_DIR)]
    pub out: String,
}

/// Arguments for the `up` command.
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Target stack.
    #[command(flatten)]
    pub target: ModeArgs,

    /// Build images before starting.
    #[arg(long)]
    pub build: bool,
}

/// Arguments for the `down` command.
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Target stack.
    #[command(flatten)]
    pub target: ModeArgs,

    /// Also remove named volumes.
    #[arg(short, long)]
    pub volumes: bool,
}

/// Arguments for commands that accept an optional service.
#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Target stack.
    #[command(flatten)]
    pub target: ModeArgs,

    /// Restrict to one service.
    pub service: Option<String>,
}

/// Executes `up`.
///
/// # Errors
///
/// Returns an error if the stack was not generated or docker fails.
pub fn up(args: UpArgs, config: &SuiteConfig) -> anyhow::Result<()> {
    let file = compose_file(config, &args.target)?;
    let mut sub = vec!["up", "-d"];
    if args.build {
        sub.push("--build");
    }
    run_docker(&compose_args(&file, &sub, None))
}

/// Executes `down`.
///
/// # Errors
///
/// Returns an error if the stack was not generated or docker fails.
pub fn down(args: DownArgs, config: &SuiteConfig) -> anyhow::Result<()> {
    let file = compose_file(config, &args.target)?;
    let mut sub = vec!["down"];
    if args.volumes {
        sub.push("-v");
    }
    run_docker(&compose_args(&file, &sub, None))
}

/// Executes `ps`.
///
/// # Errors
///
/// Returns an error if the stack was not generated or docker fails.
pub fn ps(args: ModeArgs, config: &SuiteConfig) -> anyhow::Result<()> {
    let file = compose_file(config, &args)?;
    run_docker(&compose_args(&file, &["ps"], None))
}

/// Executes `logs`, following output until interrupted.
///
/// # Errors
///
/// Returns an error if the stack was not generated or docker fails.
pub fn logs(args: ServiceArgs, config: &SuiteConfig) -> anyhow::Result<()> {
    let file = compose_file(config, &args.target)?;
    run_docker(&compose_args(&file, &["logs", "-f"], args.service.as_deref()))
}

/// Executes `restart`.
///
/// # Errors
///
/// Returns an error if the stack was not generated or docker fails.
pub fn restart(args: ServiceArgs, config: &SuiteConfig) -> anyhow::Result<()> {
    let file = compose_file(config, &args.target)?;
    run_docker(&compose_args(&file, &["restart"], args.service.as_deref()))
}

/// Executes `net-split`, creating the external networks the slices join.
///
/// A network that already exists is not an error.
///
/// # Errors
///
/// Returns an error only if docker cannot be found.
pub fn net_split() -> anyhow::Result<()> {
    let docker = docker_binary()?;
    for network in [SHARED_NETWORK, DEFAULT_TRAEFIK_NETWORK] {
        match Command::new(&docker).args(["network", "create", network]).output() {
            Ok(out) if out.status.success() => println!("created network {network}"),
            Ok(out) => {
                tracing::debug!(
                    network,
                    stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                    "network create skipped"
                );
                println!("network {network} already present");
            }
            Err(e) => tracing::warn!(network, error = %e, "network create failed"),
        }
    }
    Ok(())
}

/// Path of the generated compose file for `args.mode`.
///
/// # Errors
///
/// Returns an error if the mode is unknown or has not been generated.
pub fn compose_file(config: &SuiteConfig, args: &ModeArgs) -> anyhow::Result<PathBuf> {
    let mode = args.mode.trim();
    let known = ExampleMode::ALL.iter().any(|m| m.as_str() == mode) || mode.parse::<Topology>().is_ok();
    if !known {
        return Err(SuiteError::UnknownMode { name: mode.into() }.into());
    }
    let file = config.out_dir(&args.out).join(mode).join(COMPOSE_FILE_NAME);
    if !file.is_file() {
        bail!("{} not found; run `gatesuite gen {mode}` first", file.display());
    }
    Ok(file)
}

fn compose_args(file: &Path, sub: &[&str], service: Option<&str>) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["compose".into(), "-f".into(), file.into()];
    args.extend(sub.iter().map(OsString::from));
    if let Some(service) = service.filter(|s| !s.trim().is_empty()) {
        args.push(service.trim().into());
    }
    args
}

fn docker_binary() -> anyhow::Result<PathBuf> {
    which::which("docker").context("docker not found in PATH")
}

fn run_docker(args: &[OsString]) -> anyhow::Result<()> {
    let docker = docker_binary()?;
    tracing::debug!(?args, "running docker");
    let status = Command::new(&docker)
        .args(args)
        .status()
        .with_context(|| format!("spawn {}", docker.display()))?;
    if !status.success() {
        bail!("docker exited with {status}");
    }
    Ok(())
}
