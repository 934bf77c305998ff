//! `invsync run`: the collector daemon.

use std::sync::Arc;

use invsync_config::Config;
use invsync_core::{Collector, LogNotifier};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::CliError;

pub async fn handle(config: Config) -> Result<(), CliError> {
    let db = super::open_database(&config)?;
    let collector_config = config.into_collector_config().map_err(|e| CliError::Config {
        message: e.to_string(),
    })?;

    let collector = Collector::new(db, Arc::new(LogNotifier), &collector_config)?;
    info!(sources = ?collector.source_names(), "starting collector");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    collector.run(cancel).await.inspect_err(|e| {
        error!(error = %e, "collector failed to start");
    })?;
    Ok(())
}

/// Cancels `cancel` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
    cancel.cancel();
}
