//! `gatesuite health` / `gatesuite wait` — Probe the running services over HTTP.

use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::Args;
use gatesuite_common::constants::DEFAULT_WAIT_TIMEOUT_SECS;

use crate::output::{format_duration, status_line};

const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);
const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Arguments for the `health` command.
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Host the services publish their ports on.
    #[arg(long, default_value = "localhost")]
    pub host: String,
}

/// Arguments for the `wait` command.
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Host the services publish their ports on.
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Overall deadline, e.g. `90s` or `2m`. Invalid values fall back to 60s.
    #[arg(long, env = "TEST_WAIT_TIMEOUT")]
    pub timeout: Option<String>,
}

/// One service endpoint to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Display name.
    pub name: &'static str,
    /// Health URL.
    pub url: String,
}

/// Health endpoints of the gateway, the directory and the OTP service.
#[must_use]
pub fn probes(host: &str) -> Vec<Probe> {
    [
        ("Stargate", 8080, "/_auth"),
        ("Warden", 8081, "/health"),
        ("Herald", 8082, "/healthz"),
    ]
    .into_iter()
    .map(|(name, port, path)| Probe {
        name,
        url: format!("http://{host}:{port}{path}"),
    })
    .collect()
}

/// Executes the `health` command. Unhealthy services are reported, not fatal.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn execute(args: HealthArgs) -> anyhow::Result<()> {
    let client = client()?;
    for probe in probes(&args.host) {
        println!("Checking {}...", probe.name);
        println!("{}", status_line(probe.name, is_healthy(&client, &probe.url)));
    }
    Ok(())
}

/// Executes the `wait` command.
///
/// # Errors
///
/// Returns an error if the services are not all healthy before the deadline.
pub fn wait(args: WaitArgs) -> anyhow::Result<()> {
    let timeout = resolve_timeout(args.timeout.as_deref());
    let client = client()?;
    let probes = probes(&args.host);
    println!("Waiting for services to be ready (timeout {})...", format_duration(timeout));

    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(down) = probes.iter().find(|p| !is_healthy(&client, &p.url)) {
            tracing::debug!(service = down.name, url = %down.url, "not ready");
            std::thread::sleep(RETRY_INTERVAL);
            continue;
        }
        println!("All services ready.");
        return Ok(());
    }
    bail!(
        "services did not become ready within {}; run `gatesuite health` to check",
        format_duration(timeout)
    )
}

fn client() -> anyhow::Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(CLIENT_TIMEOUT)
        .build()
        .context("build HTTP client")
}

fn is_healthy(client: &reqwest::blocking::Client, url: &str) -> bool {
    client
        .get(url)
        .send()
        .is_ok_and(|resp| healthy_status(resp.status().as_u16()))
}

/// 2xx and 3xx count as healthy.
const fn healthy_status(code: u16) -> bool {
    matches!(code, 200..=399)
}

fn resolve_timeout(arg: Option<&str>) -> Duration {
    let fallback = Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS);
    match arg.map(str::trim).filter(|s| !s.is_empty()) {
        None => fallback,
        Some(text) => parse_duration(text).filter(|d| !d.is_zero()).unwrap_or_else(|| {
            tracing::warn!(value = text, "invalid wait timeout, using default");
            fallback
        }),
    }
}

/// Parses durations such as `60s`, `2m`, `1h30m` or `500ms`.
/// A bare number is taken as seconds.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    text.parse::<u64>()
        .map(Duration::from_secs)
        .ok()
        .or_else(|| humantime::parse_duration(text).ok())
}
