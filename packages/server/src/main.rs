use std::sync::Arc;

use anyhow::Context;
use common::storage::FilesystemBlobStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use zipvault_server::config::AppConfig;
use zipvault_server::database::init_db;
use zipvault_server::state::AppState;
use zipvault_server::store::SqlProjectStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    info!("Database connected");

    let blob_store = FilesystemBlobStore::new(
        config.storage.root.clone(),
        &config.storage.bucket,
        config.storage.chunk_size,
        config.storage.max_blob_size,
    )
    .await
    .context("Failed to open blob storage")?;
    info!(
        root = %config.storage.root.display(),
        bucket = %config.storage.bucket,
        "Blob storage ready"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        config,
        projects: Arc::new(SqlProjectStore::new(db.clone())),
        blob_store: Arc::new(blob_store),
    };
    let app = zipvault_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await.context("Failed to close database")?;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
