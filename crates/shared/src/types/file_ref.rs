//! Reference to a file persisted by a storage backend.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Handle returned by a save and required by open, remove and exists.
///
/// Backends address the stored object by `path` only; the other fields are
/// carried for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    storage_name: String,
    path: String,
    file_name: String,
    #[serde(default)]
    parameters: HashMap<String, String>,
}

impl FileRef {
    /// Creates a reference without parameters.
    #[must_use]
    pub fn new(
        storage_name: impl Into<String>,
        path: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self::with_parameters(storage_name, path, file_name, HashMap::new())
    }

    /// Creates a reference carrying caller metadata.
    #[must_use]
    pub fn with_parameters(
        storage_name: impl Into<String>,
        path: impl Into<String>,
        file_name: impl Into<String>,
        parameters: HashMap<String, String>,
    ) -> Self {
        Self {
            storage_name: storage_name.into(),
            path: path.into(),
            file_name: file_name.into(),
            parameters,
        }
    }

    /// Name of the storage that holds the file.
    #[must_use]
    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    /// Storage key of the file.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Original file name supplied on save.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Caller metadata supplied on save.
    #[must_use]
    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }
}
