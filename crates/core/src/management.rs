//! Operator-facing refresh entry points.
//!
//! Every operation reports its outcome as a status message; adapter failures
//! never propagate to the caller.

use std::sync::Arc;

use tracing::{info, warn};

use azurefs_shared::SettingsUpdate;

use crate::storage::{FileStorage, FileStorageLocator, StorageError};

/// Status returned after a successful refresh.
pub const REFRESHED: &str = "Refreshed successfully";

/// Status returned when the storage cannot be refreshed.
pub const NOT_REFRESHABLE: &str = "Not an Azure file storage - refresh attempt ignored";

/// Refresh operations over the registered storages.
#[derive(Debug, Clone)]
pub struct StorageManagementFacade {
    locator: Arc<FileStorageLocator>,
}

impl StorageManagementFacade {
    /// Create a facade over `locator`.
    #[must_use]
    pub fn new(locator: Arc<FileStorageLocator>) -> Self {
        Self { locator }
    }

    /// The locator the facade resolves storages from.
    #[must_use]
    pub fn locator(&self) -> &FileStorageLocator {
        &self.locator
    }

    /// Reconnects the default storage with its current settings.
    pub async fn refresh_default(&self) -> String {
        let storage = self.locator.get_default();
        let Some(refreshable) = storage.as_refreshable() else {
            return NOT_REFRESHABLE.to_string();
        };
        outcome(storage.as_ref(), refreshable.refresh().await)
    }

    /// Replaces the connection string and container name of the named
    /// storage, keeping its transfer options, and reconnects it.
    pub async fn refresh(
        &self,
        storage_name: &str,
        connection_string: &str,
        container_name: &str,
    ) -> String {
        self.refresh_named(
            storage_name,
            SettingsUpdate {
                connection_string: connection_string.to_string(),
                container_name: container_name.to_string(),
                block_size: None,
                max_concurrency: None,
            },
        )
        .await
    }

    /// Like [`refresh`](Self::refresh), also replacing the transfer options.
    pub async fn refresh_with_transfer(
        &self,
        storage_name: &str,
        connection_string: &str,
        container_name: &str,
        block_size: u64,
        max_concurrency: usize,
    ) -> String {
        self.refresh_named(
            storage_name,
            SettingsUpdate {
                connection_string: connection_string.to_string(),
                container_name: container_name.to_string(),
                block_size: Some(block_size),
                max_concurrency: Some(max_concurrency),
            },
        )
        .await
    }

    async fn refresh_named(&self, storage_name: &str, update: SettingsUpdate) -> String {
        let Some(storage) = self.locator.get_by_name(storage_name) else {
            return unknown_storage(storage_name);
        };
        let Some(refreshable) = storage.as_refreshable() else {
            return NOT_REFRESHABLE.to_string();
        };
        outcome(storage.as_ref(), refreshable.refresh_with(update).await)
    }
}

fn unknown_storage(name: &str) -> String {
    format!("No file storage named '{name}'")
}

fn outcome(
    storage: &dyn FileStorage,
    result: Result<(), StorageError>,
) -> String {
    match result {
        Ok(()) => {
            info!(storage = storage.storage_name(), "Storage refreshed");
            REFRESHED.to_string()
        }
        Err(e) => {
            warn!(storage = storage.storage_name(), error = %e, "Storage refresh failed");
            format!("Refresh failed: {e}")
        }
    }
}
