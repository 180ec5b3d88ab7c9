use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulse::api::{AppState, router};
use pulse::config::{Cli, Config};
use pulse::server::Server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = Arc::new(AppState::new(config));
    // Lazy expiry already hides stale entries; the sweeper only reclaims memory.
    let sweeper = state
        .cache
        .spawn_sweeper(state.config.cache_default_timeout);

    let app = Arc::new(router(Arc::clone(&state)));
    let server = Server::bind(cli.address()).await?;
    info!(
        address = %server.local_addr(),
        cache_timeout = ?state.config.cache_default_timeout,
        "routes: GET /, /health, /heavy, /cacheme/:param, /error"
    );

    server
        .run_until(
            move |req| {
                let app = Arc::clone(&app);
                async move { app.route(req).await }
            },
            shutdown_signal(),
        )
        .await?;

    sweeper.abort();
    info!("server stopped");
    Ok(())
}

// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C"),
        () = terminate => info!("received SIGTERM"),
    }
}
