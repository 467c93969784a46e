//! Token ledger HTTP server binary

use anyhow::Context;
use std::sync::Arc;
use token_ledger::{Config, Ledger};
use token_ledger_gateway::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting token ledger server");

    // Load configuration: file first (if any), then environment overrides
    let config = match std::env::var("LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?
            .with_env_overrides()?,
        Err(_) => Config::from_env()?,
    };
    config.validate().context("invalid configuration")?;

    let listen_addr = config.listen_addr.clone();
    let metrics_enabled = config.metrics_enabled;

    let ledger = Arc::new(Ledger::open(config).context("failed to open ledger")?);
    tracing::info!("Ledger opened successfully");

    let app = router(AppState::new(ledger, metrics_enabled));

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", listen_addr))?;
    tracing::info!(addr = %listen_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("Shutting down token ledger server");
    Ok(())
}
