use std::net::SocketAddr;

use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use formsheet::config::Config;
use formsheet::error::ConfigError;
use formsheet::state::SharedState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting formsheet");

    let backend = match formsheet::sheets_backend(&config) {
        Ok(appender) => Ok(appender),
        Err(ConfigError::Missing(key)) => {
            tracing::error!("{key} is not set; every submission will fail until it is configured");
            Err(ConfigError::Missing(key))
        }
        Err(err) => return Err(err.into()),
    };

    let addr = SocketAddr::new(config.host, config.port);
    let (app, state) = formsheet::build_app(config, backend);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(sweep_rate_limits(state, shutdown_rx));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;

    Ok(())
}

/// Forget rate-limit windows that have expired, once per window.
async fn sweep_rate_limits(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let window = state.limiter.window().max(std::time::Duration::from_secs(1));
    let mut ticker = tokio::time::interval(window);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                state.limiter.cleanup(window);
                tracing::trace!("Rate limiter tracking {} addresses", state.limiter.tracked());
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
