//! azurefs management server
//!
//! Connects the Azure Blob file storage and serves the management routes.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use azurefs_api::{AppState, create_router};
use azurefs_core::azure::{AzureConnector, AzureFileStorage};
use azurefs_core::{FileStorageLocator, StorageManagementFacade};
use azurefs_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "azurefs=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;
    info!(settings = ?config.storage, "Storage configured");

    // Connect the storage before accepting requests
    let connector = Arc::new(AzureConnector::new()?);
    let storage = Arc::new(AzureFileStorage::new(config.storage.clone(), connector));
    storage
        .init()
        .await
        .context("failed to initialize file storage")?;
    if !storage.is_connected() {
        warn!(
            storage = %config.storage.storage_name,
            "File storage has no container yet; use the refresh endpoint once it is reachable"
        );
    }

    let locator = FileStorageLocator::new(storage);
    let facade = Arc::new(StorageManagementFacade::new(Arc::new(locator)));
    let state = AppState::new(facade).with_management_token(config.management.token.clone());
    if state.management_token.is_none() {
        warn!("No management token configured; management routes are open");
    }

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
