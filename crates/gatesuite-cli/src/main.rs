//! # gatesuite — Herald / Warden / Stargate CLI
//!
//! Generates compose topologies and environment files from the canonical
//! compose document, serves the same generator over HTTP, and drives the
//! resulting stacks through `docker compose`.

mod commands;
mod output;

use clap::Parser;
use gatesuite_common::constants::DEFAULT_LOG_FILTER;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "parsed command line");
    commands::execute(cli)
}

/// `RUST_LOG` when set and valid, otherwise [`DEFAULT_LOG_FILTER`].
fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}
