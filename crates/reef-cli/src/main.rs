use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info};

use reef_core::app::NotificationDispatch;
use reef_core::impls::{InMemoryDataStore, LogMailer, TextRenderer};
use reef_core::observability::init_tracing;
use reef_core::ports::{Clock, SystemClock};
use reef_core::queue::InMemoryTransport;
use reef_core::{
    BuildError, Collaborators, ConfigError, LogFormat, ReefConfig, TransportError, assemble,
};

#[derive(Debug, Parser)]
#[command(name = "reef-worker", about = "Reef background job worker", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json). Overrides the config file.
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to build tokio runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("no queue could be opened")]
    NothingRunning,
}

fn main() -> Result<(), CliError> {
    let args = Cli::parse();
    let mut config = ReefConfig::load(args.config.as_deref())?;
    if let Some(format) = args.log_format {
        config.log_format = format;
    }
    init_tracing(config.log_format)?;
    info!(transport_url = %config.transport_url, "reef-worker bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: ReefConfig) -> Result<(), CliError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let transport = InMemoryTransport::connect(&config.transport_url, Arc::clone(&clock))
        .inspect_err(|err| error!(%err, "transport connection failed"))?;

    // the product database is not wired into this binary; jobs run against
    // an empty in-memory store and mail goes to the log
    let store = Arc::new(InMemoryDataStore::new());
    let mut system = assemble(
        Collaborators {
            transport: Arc::new(transport),
            tenants: store.clone(),
            bookings: store.clone(),
            maintenance: store.clone(),
            reports: store,
            notifications: NotificationDispatch::new(
                Arc::new(LogMailer),
                Arc::new(TextRenderer::default()),
            ),
            clock,
        },
        &config.concurrency,
    )?;

    system.register_schedule().await?;
    let running = system.start().await;
    if running.is_empty() {
        system.shutdown().await;
        return Err(CliError::NothingRunning);
    }
    info!(queues = ?running, "reef-worker ready");

    shutdown_signal().await;
    info!("shutdown signal received");
    system.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}
