use anyhow::Context;
use clap::Parser;
use pantry_server::{cli, cli::Cli, router, telemetry, AppState, Live};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    telemetry::init(config.server.log_format);
    match cli.config_path() {
        Some(path) => tracing::info!(path = %path.display(), "Loaded configuration file"),
        None => tracing::info!("No configuration file; using defaults and environment"),
    }

    let default_db = cli::default_db_path()?;
    let state = AppState::<Live>::from_config(&config, &default_db)
        .await
        .context("Failed to initialise application state")?;

    let app = router(state, config.server.max_upload_bytes);
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
