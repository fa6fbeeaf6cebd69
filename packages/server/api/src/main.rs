//! Process entry point: load config, build `AppState`, serve `/v1` until a
//! graceful shutdown signal (spec §4.K: exit 0 on graceful shutdown,
//! non-zero on fatal init error).

mod auth_user;
mod config;
mod error;
mod handlers;
mod middleware;
mod router;
mod services;
mod state;

use config::Config;
use state::AppState;
use std::net::SocketAddr;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone().unwrap_or_else(|| "info".to_string()))),
        )
        .init();

    let port = config.port;
    let state = AppState::build(config).await?;

    let cors = CorsLayer::permissive();

    let app = router::routes(state)
        .layer(CookieManagerLayer::new())
        .layer(axum::extract::DefaultBodyLimit::max(200 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "submitter-api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

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
    tracing::info!("shutdown signal received, draining in-flight requests");
}
