//! Process entry point for the ingest poller (spec §4.J): a single
//! dedicated long-running task, no HTTP surface, ticking on a fixed
//! interval until a graceful shutdown signal.

mod config;

use clients::ArchiveAdminClient;
use config::Config;
use database::Database;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use worker::Poller;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone().unwrap_or_else(|| "info".to_string()))),
        )
        .init();

    let db = Database::connect(&config.pg_database_url, config.db_max_connections).await?;
    let archive = Arc::new(ArchiveAdminClient::new(
        &config.admin_url,
        config.admin_token.clone().unwrap_or_default(),
        config.external_timeout(),
    )?);

    let poller = Poller::new(db, archive, std::time::Duration::from_secs(config.polling_interval));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    tracing::info!(interval_secs = config.polling_interval, "ingest-poller starting");
    poller.run(shutdown_rx).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received, finishing in-flight tick");
}
