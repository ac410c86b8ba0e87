use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use h2c_server::settings::Settings;
use h2c_server::state::AppState;
use h2c_server::{http, tls};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = Settings::from_env().context("loading H2C_* settings from environment")?;
    tracing::info!(
        compose = %settings.compose,
        data_dir = %settings.data_dir,
        port = settings.port,
        "starting h2c-server"
    );

    let listener = tls::resolve(&settings).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let app = http::router(AppState::new(settings));

    tls::serve(app, addr, listener, shutdown_signal()).await
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Waits for Ctrl-C or SIGTERM so the server can drain in-flight requests
/// before axum's graceful shutdown tears the listener down.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
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

    tracing::info!("shutdown signal received");
}
