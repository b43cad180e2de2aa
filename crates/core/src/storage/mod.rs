//! Generic file storage contract.
//!
//! Backends implement [`FileStorage`] and are addressed by name through a
//! [`FileStorageLocator`]. Backends whose client can be rebuilt at runtime also
//! expose [`RefreshableStorage`] via [`FileStorage::as_refreshable`].

mod error;
pub mod key;
mod locator;

use std::collections::HashMap;
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use azurefs_shared::{FileRef, SettingsUpdate};

pub use error::StorageError;
pub use locator::FileStorageLocator;

/// Byte stream accepted on save and returned on open.
pub type ByteReader = Box<dyn AsyncRead + Send + Unpin>;

/// Wraps in-memory bytes as a [`ByteReader`].
#[must_use]
pub fn reader_from_bytes(data: impl Into<Bytes>) -> ByteReader {
    Box::new(Cursor::new(data.into()))
}

/// A named file storage backend.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Name the storage is registered under.
    fn storage_name(&self) -> &str;

    /// Stores the stream under a freshly generated key.
    async fn save_stream(
        &self,
        file_name: &str,
        reader: ByteReader,
        parameters: HashMap<String, String>,
    ) -> Result<FileRef, StorageError>;

    /// Stores in-memory bytes without metadata.
    async fn save_bytes(&self, file_name: &str, data: Bytes) -> Result<FileRef, StorageError> {
        self.save_stream(file_name, reader_from_bytes(data), HashMap::new())
            .await
    }

    /// Opens the file identified by `reference`.
    async fn open_stream(&self, reference: &FileRef) -> Result<ByteReader, StorageError>;

    /// Removes the file identified by `reference`.
    async fn remove_file(&self, reference: &FileRef) -> Result<(), StorageError>;

    /// Whether the file identified by `reference` exists.
    async fn file_exists(&self, reference: &FileRef) -> bool;

    /// Refresh capability, if this backend supports it.
    fn as_refreshable(&self) -> Option<&dyn RefreshableStorage> {
        None
    }
}

/// Capability of rebuilding the backend client at runtime.
#[async_trait]
pub trait RefreshableStorage: Send + Sync {
    /// Reconnects with the currently held settings.
    async fn refresh(&self) -> Result<(), StorageError>;

    /// Applies `update` to the held settings, then reconnects.
    async fn refresh_with(&self, update: SettingsUpdate) -> Result<(), StorageError>;
}
