//! # Volunteer Expiry Sweeper
//!
//! Standalone process that expires lapsed waitlist offers against PostgreSQL
//! and passes freed seats to the next volunteer in line.
//!
//! ## Usage
//!
//! ```bash
//! # Run with defaults plus environment overrides
//! VOLUNTEER_DATABASE__URL=postgresql://localhost/volunteers cargo run --bin expiry-sweeper
//!
//! # Run with a config file
//! VOLUNTEER_CONFIG_PATH=config/volunteer.toml cargo run --bin expiry-sweeper
//! ```

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use volunteer_core::logging;
use volunteer_core::{SystemContext, VolunteerConfig, VolunteerCoordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    info!("Starting volunteer expiry sweeper");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let config = VolunteerConfig::load().context("failed to load volunteer configuration")?;
    if !config.waitlist.sweep_enabled {
        warn!("Expiry sweep is disabled by configuration; exiting");
        return Ok(());
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("failed to connect to the volunteer database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to apply database migrations")?;

    info!(
        interval_seconds = config.waitlist.sweep_interval_seconds,
        acceptance_window_hours = config.waitlist.acceptance_window_hours,
        "Database ready"
    );

    let coordinator = VolunteerCoordinator::new(SystemContext::with_pool(pool, config));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = coordinator.sweeper().spawn(shutdown_rx);

    info!("   Press Ctrl+C to shutdown gracefully");
    shutdown_signal().await;

    info!("Shutdown signal received, stopping sweeper");
    if shutdown_tx.send(true).is_err() {
        warn!("Sweeper task already stopped");
    }
    if let Err(e) = handle.await {
        error!(error = %e, "Sweeper task ended abnormally");
    }

    let pending = coordinator.context().notifier.pending_batches();
    if pending > 0 {
        info!(pending_batches = pending, "Waiting for queued notifications");
        coordinator.context().notifier.wait_idle().await;
    }

    info!("Expiry sweeper shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
