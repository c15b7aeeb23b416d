//! CLI command definitions and dispatch.

pub mod docker;
pub mod generate;
pub mod health;
pub mod serve;
pub mod validate;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gatesuite_common::config::SuiteConfig;

/// gatesuite — Compose generator and stack driver for Herald, Warden and Stargate.
#[derive(Parser, Debug)]
#[command(name = "gatesuite", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Project root. Discovered from the working directory when omitted.
    #[arg(long, global = true, env = "GATESUITE_ROOT")]
    pub root: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate compose files and .env for one or all modes.
    Gen(generate::GenArgs),
    /// Generate the three independently deployable slices.
    GenSplit(generate::GenSplitArgs),
    /// Check that the canonical compose document generates every topology.
    Validate(validate::ValidateArgs),
    /// Serve the generator over HTTP.
    Serve(serve::ServeArgs),
    /// Start a generated stack in the background.
    Up(docker::UpArgs),
    /// Stop and remove a generated stack.
    Down(docker::DownArgs),
    /// List the containers of a generated stack.
    Ps(docker::ModeArgs),
    /// Follow the logs of a stack or one of its services.
    Logs(docker::ServiceArgs),
    /// Restart a stack or one of its services.
    Restart(docker::ServiceArgs),
    /// Pre-create the external networks shared by the slices.
    NetSplit,
    /// Probe each service once and report its status.
    Health(health::HealthArgs),
    /// Block until every service is healthy or the deadline passes.
    Wait(health::WaitArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli.root)?;
    match cli.command {
        Command::Gen(args) => generate::execute(args, &config),
        Command::GenSplit(args) => generate::execute_split(args, &config),
        Command::Validate(args) => validate::execute(args, &config),
        Command::Serve(args) => serve::execute(args, config),
        Command::Up(args) => docker::up(args, &config),
        Command::Down(args) => docker::down(args, &config),
        Command::Ps(args) => docker::ps(args, &config),
        Command::Logs(args) => docker::logs(args, &config),
        Command::Restart(args) => docker::restart(args, &config),
        Command::NetSplit => docker::net_split(),
        Command::Health(args) => health::execute(args),
        Command::Wait(args) => health::wait(args),
    }
}

fn resolve_config(root: Option<PathBuf>) -> anyhow::Result<SuiteConfig> {
    if let Some(root) = root {
        return Ok(SuiteConfig::at(root));
    }
    let cwd = std::env::current_dir().context("resolve working directory")?;
    Ok(SuiteConfig::discover(&cwd))
}
