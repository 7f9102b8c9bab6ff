//! # ferry-cli
//!
//! The `ferry` binary: loads settings, wires the session registry, both
//! agent transports, and the orchestrator together, then hands control to
//! the console front-end.

#![deny(unsafe_code)]

mod console;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ferry_agent::{
    AvailabilityProbe, CliRunner, DaemonClient, DaemonConfig, ProbeConfig, ProcessConfig,
};
use ferry_runtime::{AutonomyPolicy, RuntimeConfig, TurnOrchestrator};
use ferry_sessions::SessionRegistry;
use ferry_settings::FerrySettings;

/// Ferry console.
#[derive(Parser, Debug)]
#[command(name = "ferry", about = "Console relay for an AI coding agent")]
struct Cli {
    /// Settings file (default `~/.ferry/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Working directory for new conversations.
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Agent daemon base URL.
    #[arg(long)]
    agent_url: Option<String>,

    /// Agent CLI command for the subprocess path.
    #[arg(long)]
    command: Option<String>,

    /// Session registry file.
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Log level filter (`RUST_LOG` wins when set).
    #[arg(long)]
    log_level: Option<String>,
}

fn ensure_parent_dir(path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load settings and fold the command-line overrides in on top.
fn load_settings(args: &Cli) -> Result<FerrySettings> {
    let mut settings = match &args.config {
        Some(path) => ferry_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => ferry_settings::load_settings().unwrap_or_default(),
    };
    if let Some(url) = &args.agent_url {
        settings.agent.base_url.clone_from(url);
    }
    if let Some(command) = &args.command {
        settings.agent.command.clone_from(command);
    }
    if let Some(dir) = &args.workdir {
        settings.agent.default_working_dir = Some(dir.display().to_string());
    }
    if let Some(path) = &args.registry {
        settings.registry.path = Some(path.display().to_string());
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = load_settings(&args)?;

    let level = args
        .log_level
        .as_deref()
        .unwrap_or_else(|| settings.logging.level.as_filter_str());
    init_tracing(level);

    let registry_path = settings.registry.resolve_path();
    ensure_parent_dir(&registry_path)?;
    let registry = Arc::new(SessionRegistry::open(registry_path));

    let daemon = Arc::new(DaemonClient::new(DaemonConfig {
        base_url: settings.agent.base_url.clone(),
    }));
    let process = Arc::new(CliRunner::new(ProcessConfig {
        command: settings.agent.command.clone(),
        grace: Duration::from_millis(settings.process.grace_ms),
    }));
    let probe = Arc::new(AvailabilityProbe::new(
        settings.agent.base_url.clone(),
        ProbeConfig {
            ttl: Duration::from_millis(settings.probe.ttl_ms),
            timeout: Duration::from_millis(settings.probe.timeout_ms),
        },
    ));

    let default_working_dir = settings.agent.resolve_default_working_dir();
    let sink = Arc::new(console::ConsoleSink::new());
    let orchestrator = Arc::new(TurnOrchestrator::new(
        registry,
        probe.clone(),
        daemon,
        process,
        Arc::new(AutonomyPolicy),
        sink.clone(),
        RuntimeConfig {
            default_working_dir: default_working_dir.clone(),
            throttle_interval: Duration::from_millis(settings.stream.throttle_ms),
            response_limit_chars: settings.stream.response_limit_chars,
        },
    ));

    info!(
        base_url = %settings.agent.base_url,
        command = %settings.agent.command,
        "ferry console starting"
    );

    console::run(orchestrator, probe, sink, default_working_dir).await
}
