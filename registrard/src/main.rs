mod adapters;
mod config;
mod fixture;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use registrar_bridge::{Bridge, RunnerOptions, RuntimeClient, run};
use registrar_common::init_tracing;

use crate::config::DaemonConfig;
use crate::fixture::FixtureRuntime;

/// Service-discovery bridge daemon for one container host.
#[derive(Parser, Debug)]
#[command(name = "registrard", version)]
#[command(about = "Register container services with a service registry", long_about = None)]
struct Args {
    /// Path to the configuration file (JSON5 format).
    #[arg(short, long, default_value = "registrard.json5")]
    config: PathBuf,

    /// Log level override.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = DaemonConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging).context("Failed to initialize tracing")?;

    let hostname = if config.hostname.is_empty() {
        hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        config.hostname.clone()
    };

    tracing::info!(
        config = ?args.config,
        hostname = %hostname,
        registry = %config.registry.uri,
        "Starting registrard"
    );
    if !config.bridge.host_ip.is_empty() {
        tracing::info!(ip = %config.bridge.host_ip, "Forcing host IP");
    }

    let registry = adapters::lookup(&config.registry.uri)?;
    let runtime: Arc<dyn RuntimeClient> = Arc::new(
        FixtureRuntime::load(&config.runtime.fixture)
            .with_context(|| format!("Failed to load fixture {:?}", config.runtime.fixture))?,
    );
    let bridge = Arc::new(Bridge::new(
        runtime.clone(),
        registry,
        config.bridge.clone(),
        hostname,
    ));

    // First registry contact, with a bounded or infinite retry budget.
    let max_attempts = config.registry.retry_attempts as i64;
    let mut attempt: i64 = 0;
    loop {
        tracing::info!(attempt, max = max_attempts, "Connecting to registry backend");
        match bridge.ping().await {
            Ok(()) => break,
            Err(e) if max_attempts >= 0 && attempt >= max_attempts => {
                return Err(e).context("Registry unreachable");
            }
            Err(e) => tracing::warn!(error = %e, "Registry ping failed"),
        }
        tokio::time::sleep(Duration::from_millis(config.registry.retry_interval_ms)).await;
        attempt += 1;
    }

    // Subscribe before the startup sync so nothing slips between the two.
    let stream = runtime
        .subscribe()
        .await
        .context("Event subscription failed")?;

    bridge.clone().sync(false).await.context("Startup sync failed")?;

    let shutdown = CancellationToken::new();
    let options = RunnerOptions {
        refresh_interval: config.bridge.refresh_interval,
        resync_interval: config.resync_interval,
    };
    let event_loop = tokio::spawn(run(bridge.clone(), stream, options, shutdown.clone()));

    tracing::info!("Bridge running. Press Ctrl+C to stop.");

    signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");

    shutdown.cancel();
    let _ = event_loop.await;

    tracing::info!("Goodbye!");

    Ok(())
}
