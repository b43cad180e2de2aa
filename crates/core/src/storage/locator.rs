//! Registry of file storages by name.

use std::collections::HashMap;
use std::sync::Arc;

use super::FileStorage;

/// Looks up file storages by name.
#[derive(Clone)]
pub struct FileStorageLocator {
    storages: HashMap<String, Arc<dyn FileStorage>>,
    default_name: String,
}

impl FileStorageLocator {
    /// Create a locator whose default storage is `default_storage`.
    #[must_use]
    pub fn new(default_storage: Arc<dyn FileStorage>) -> Self {
        let default_name = default_storage.storage_name().to_string();
        let mut storages = HashMap::new();
        storages.insert(default_name.clone(), default_storage);
        Self {
            storages,
            default_name,
        }
    }

    /// Add a storage, replacing any storage registered under the same name.
    #[must_use]
    pub fn register(mut self, storage: Arc<dyn FileStorage>) -> Self {
        self.storages
            .insert(storage.storage_name().to_string(), storage);
        self
    }

    /// The default storage.
    #[must_use]
    pub fn get_default(&self) -> Arc<dyn FileStorage> {
        // the default is inserted on construction and register never removes
        Arc::clone(&self.storages[&self.default_name])
    }

    /// The storage registered under `name`.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn FileStorage>> {
        self.storages.get(name).cloned()
    }

    /// Name of the default storage.
    #[must_use]
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn storage_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.storages.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for FileStorageLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorageLocator")
            .field("storages", &self.storage_names())
            .field("default_name", &self.default_name)
            .finish()
    }
}
