//! Statshub Archive Binary Entry Point
//!
//! Loads the configuration, wires the store pool and the archive table
//! service together, then archives on a fixed interval until signalled.

use std::sync::Arc;

use clap::Parser;
use statshub_archive::{
    ArchiveService, ArchiveWriter, ConnectionPool,
    config::{AppConfig, ArchiveBackend},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Statshub Archive - periodic stats archiver
#[derive(Parser, Debug)]
#[command(name = "statshub-archive", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "STATSHUB_ARCHIVE_CONFIG"
    )]
    config: String,

    /// Store address as host:port (overrides config file)
    #[arg(long, env = "STATSHUB_ARCHIVE_STORE_ADDRESS")]
    store_address: Option<String>,

    /// Run a single archive cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,statshub_archive=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load(&cli.config)?;

    // CLI > ENV > config file
    if let Some(address) = cli.store_address {
        config.store.address = address;
        config.validate()?;
    }

    let table = config.archive.table();
    tracing::info!(
        store = %config.store.address,
        table = %table,
        backend = %config.archive.backend,
        interval = %humantime::format_duration(config.archive.interval),
        "Statshub Archive starting"
    );
    if config.archive.backend == ArchiveBackend::Memory {
        tracing::warn!("Memory backend selected; archived rows are lost on exit");
    }

    let pool = ConnectionPool::new(
        Arc::new(config.store.dialer()),
        config.store.pool_options(),
    );
    let writer = ArchiveWriter::new(config.archive.table_service(), table);
    let service = Arc::new(ArchiveService::new(pool, config.store.reader(), writer));

    if cli.once {
        let result = Arc::clone(&service).run_cycle().await;
        service.pool().clear();
        result?;
        tracing::info!("Single archive cycle complete");
        return Ok(());
    }

    service.run(config.archive.interval, shutdown_signal()).await;

    tracing::info!("Statshub Archive stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
