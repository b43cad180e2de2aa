//! Storage refresh routes.
//!
//! Mounted under `/management/azurefs`. Every outcome of a refresh, including
//! unknown storages and failed reconnects, is reported as `{"status": ..}`.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;
use crate::error::ApiError;
use azurefs_shared::AppError;

/// Creates the management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/refresh", post(refresh_default))
        .route("/storages/{storage_name}/refresh", post(refresh_storage))
}

/// Request body for refreshing a named storage.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// New connection string.
    pub connection_string: String,
    /// New container name.
    pub container_name: String,
    /// New upload block size in bytes.
    #[serde(default)]
    pub block_size: Option<u64>,
    /// New upload concurrency.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

/// Outcome of a refresh.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Human-readable status message.
    pub status: String,
}

async fn refresh_default(State(state): State<AppState>) -> Json<StatusResponse> {
    info!("Refreshing default file storage");
    let status = state.facade.refresh_default().await;
    Json(StatusResponse { status })
}

async fn refresh_storage(
    State(state): State<AppState>,
    Path(storage_name): Path<String>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    info!(storage = %storage_name, container = %body.container_name, "Refreshing file storage");
    let status = match (body.block_size, body.max_concurrency) {
        (Some(block_size), Some(max_concurrency)) => {
            state
                .facade
                .refresh_with_transfer(
                    &storage_name,
                    &body.connection_string,
                    &body.container_name,
                    block_size,
                    max_concurrency,
                )
                .await
        }
        (None, None) => {
            state
                .facade
                .refresh(&storage_name, &body.connection_string, &body.container_name)
                .await
        }
        _ => {
            return Err(AppError::Validation(
                "block_size and max_concurrency must be given together".into(),
            )
            .into());
        }
    };
    Ok(Json(StatusResponse { status }))
}
