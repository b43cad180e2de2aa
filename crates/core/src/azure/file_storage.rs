//! File storage persisting files as blobs in an Azure Storage container.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use bytes::BytesMut;
use opendal::{ErrorKind, Operator, Writer};
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use azurefs_shared::{FileRef, SettingsUpdate, StorageSettings};

use super::service::{BlobServiceConnector, ContainerHandle, ServiceError};
use crate::clock::{Clock, SystemClock};
use crate::storage::key::{content_type, create_file_key};
use crate::storage::{
    ByteReader, FileStorage, RefreshableStorage, StorageError, reader_from_bytes,
};

/// Connected container together with the transfer options it was built with.
#[derive(Debug)]
struct ActiveContainer {
    handle: ContainerHandle,
    block_size: u64,
    max_concurrency: usize,
}

impl ActiveContainer {
    fn chunk_size(&self) -> usize {
        usize::try_from(self.block_size).unwrap_or(usize::MAX)
    }
}

/// Upper bound of a single read from the caller's stream.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Azure Blob Storage backend.
///
/// Unusable until [`AzureFileStorage::init`] has connected it: save, open and
/// remove fail with an I/O error and existence checks report `false`.
/// Refreshing swaps the container handle atomically; calls already running
/// finish against the handle they started with. Connects and refreshes run
/// one at a time.
pub struct AzureFileStorage {
    name: String,
    settings: ArcSwap<StorageSettings>,
    active: ArcSwapOption<ActiveContainer>,
    refresh_guard: Mutex<()>,
    connector: Arc<dyn BlobServiceConnector>,
    clock: Arc<dyn Clock>,
}

impl AzureFileStorage {
    /// Create a storage from settings. Nothing is contacted until [`init`](Self::init).
    #[must_use]
    pub fn new(settings: StorageSettings, connector: Arc<dyn BlobServiceConnector>) -> Self {
        Self {
            name: settings.storage_name.clone(),
            settings: ArcSwap::from_pointee(settings),
            active: ArcSwapOption::empty(),
            refresh_guard: Mutex::new(()),
            connector,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a storage overriding the configured settings.
    #[must_use]
    pub fn with_settings(
        storage_name: impl Into<String>,
        connection_string: impl Into<String>,
        container_name: impl Into<String>,
        block_size: u64,
        max_concurrency: usize,
        connector: Arc<dyn BlobServiceConnector>,
    ) -> Self {
        let settings = StorageSettings::new(connection_string, container_name)
            .with_storage_name(storage_name)
            .with_transfer(block_size, max_concurrency);
        Self::new(settings, connector)
    }

    /// Set the time source used for storage keys.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Snapshot of the current settings.
    #[must_use]
    pub fn settings(&self) -> Arc<StorageSettings> {
        self.settings.load_full()
    }

    /// Whether a container handle is set.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.active.load().is_some()
    }

    /// Name of the connected container.
    #[must_use]
    pub fn container_name(&self) -> Option<String> {
        self.active
            .load()
            .as_ref()
            .map(|active| active.handle.name().to_string())
    }

    /// Connects the storage for the first time.
    pub async fn init(&self) -> Result<(), StorageError> {
        self.connect().await
    }

    /// Builds a container handle from the current settings and swaps it in.
    ///
    /// The container is created when missing and attached when it already
    /// exists. Any other failure is logged and leaves the previous handle in
    /// place, unless `strict_startup` is set, in which case it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] for empty settings or a
    /// malformed connection string.
    pub async fn connect(&self) -> Result<(), StorageError> {
        let _guard = self.refresh_guard.lock().await;
        let settings = self.settings.load_full();
        self.connect_with(&settings).await.map(|_| ())
    }

    /// Applies `update` and reconnects. The settings are replaced only when a
    /// new container handle was stored.
    async fn reconnect_with(&self, update: &SettingsUpdate) -> Result<(), StorageError> {
        let _guard = self.refresh_guard.lock().await;
        let next = self.settings.load().updated(update);
        if self.connect_with(&next).await? {
            self.settings.store(Arc::new(next));
        } else {
            warn!(storage = %self.name, "Settings update discarded, previous container kept");
        }
        Ok(())
    }

    /// Connects with `settings`. Returns whether a new handle was stored.
    async fn connect_with(&self, settings: &StorageSettings) -> Result<bool, StorageError> {
        settings.validate()?;

        let service = self.connector.connect(&settings.connection_string)?;
        let container = &settings.container_name;

        let handle = match service.create_container(container).await {
            Ok(handle) => handle,
            Err(ServiceError::ContainerAlreadyExists(_)) => match service.container(container) {
                Ok(handle) => handle,
                Err(e) => return self.container_unavailable(settings, &e).map(|()| false),
            },
            Err(e) => return self.container_unavailable(settings, &e).map(|()| false),
        };

        self.active.store(Some(Arc::new(ActiveContainer {
            handle,
            block_size: settings.block_size,
            max_concurrency: settings.max_concurrency,
        })));
        info!(
            storage = %self.name,
            container = %container,
            block_size = settings.block_size,
            max_concurrency = settings.max_concurrency,
            "Blob container client ready"
        );
        Ok(true)
    }

    fn container_unavailable(
        &self,
        settings: &StorageSettings,
        err: &ServiceError,
    ) -> Result<(), StorageError> {
        warn!(
            storage = %self.name,
            container = %settings.container_name,
            error_code = err.error_code(),
            error = %err,
            "Blob container could not be created or attached"
        );
        if settings.strict_startup {
            return Err(StorageError::Backend(err.to_string()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for AzureFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureFileStorage")
            .field("name", &self.name)
            .field("settings", &self.settings.load_full())
            .field("container", &self.container_name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FileStorage for AzureFileStorage {
    fn storage_name(&self) -> &str {
        &self.name
    }

    async fn save_stream(
        &self,
        file_name: &str,
        mut reader: ByteReader,
        parameters: HashMap<String, String>,
    ) -> Result<FileRef, StorageError> {
        let failed = || format!("Could not save file {file_name}.");
        let key = create_file_key(file_name, self.clock.now());
        let active = self
            .active
            .load_full()
            .ok_or_else(|| StorageError::io(failed()))?;

        let operator = active.handle.operator();
        let mime = content_type(file_name);
        let size = if operator.info().full_capability().write_can_multi {
            let mut writer = operator
                .writer_with(&key)
                .content_type(&mime)
                .chunk(active.chunk_size())
                .concurrent(active.max_concurrency)
                .await
                .map_err(|e| StorageError::io_with_source(failed(), e))?;
            match copy_to_writer(&mut reader, &mut writer, active.chunk_size()).await {
                Ok(size) => {
                    writer
                        .close()
                        .await
                        .map_err(|e| StorageError::io_with_source(failed(), e))?;
                    size
                }
                Err(e) => {
                    if let Err(abort) = writer.abort().await {
                        warn!(storage = %self.name, key = %key, error = %abort, "Aborting upload failed");
                    }
                    return Err(StorageError::io_with_source(failed(), e));
                }
            }
        } else {
            write_once(operator, &key, &mime, &mut reader)
                .await
                .map_err(|e| StorageError::io_with_source(failed(), e))?
        };

        debug!(storage = %self.name, key = %key, size, "Saved file");
        Ok(FileRef::with_parameters(
            self.name.clone(),
            key,
            file_name,
            parameters,
        ))
    }

    async fn open_stream(&self, reference: &FileRef) -> Result<ByteReader, StorageError> {
        let failed = || format!("Could not load file {}.", reference.file_name());
        let active = self
            .active
            .load_full()
            .ok_or_else(|| StorageError::io(failed()))?;

        let buffer = active
            .handle
            .operator()
            .read(reference.path())
            .await
            .map_err(|e| StorageError::io_with_source(failed(), e))?;
        Ok(reader_from_bytes(buffer.to_bytes()))
    }

    async fn remove_file(&self, reference: &FileRef) -> Result<(), StorageError> {
        let failed = || format!("Could not delete file {}.", reference.file_name());
        let active = self
            .active
            .load_full()
            .ok_or_else(|| StorageError::io(failed()))?;

        active
            .handle
            .operator()
            .delete(reference.path())
            .await
            .map_err(|e| StorageError::io_with_source(failed(), e))?;
        debug!(storage = %self.name, key = reference.path(), "Removed file");
        Ok(())
    }

    async fn file_exists(&self, reference: &FileRef) -> bool {
        let Some(active) = self.active.load_full() else {
            return false;
        };
        match active.handle.operator().stat(reference.path()).await {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!(storage = %self.name, key = reference.path(), error = %e, "Existence check failed");
                false
            }
        }
    }

    fn as_refreshable(&self) -> Option<&dyn RefreshableStorage> {
        Some(self)
    }
}

#[async_trait]
impl RefreshableStorage for AzureFileStorage {
    async fn refresh(&self) -> Result<(), StorageError> {
        self.connect().await
    }

    async fn refresh_with(&self, update: SettingsUpdate) -> Result<(), StorageError> {
        self.reconnect_with(&update).await
    }
}

/// Streams `reader` into `writer` in pieces of at most `chunk_size` bytes.
async fn copy_to_writer(
    reader: &mut ByteReader,
    writer: &mut Writer,
    chunk_size: usize,
) -> std::io::Result<usize> {
    let mut buf = BytesMut::new();
    let mut total = 0;
    loop {
        buf.reserve(chunk_size.min(READ_BUFFER_SIZE));
        let read = reader.read_buf(&mut buf).await?;
        if read == 0 {
            break;
        }
        total += read;
        if buf.len() >= chunk_size {
            writer
                .write(buf.split().freeze())
                .await
                .map_err(std::io::Error::other)?;
        }
    }
    if !buf.is_empty() {
        writer
            .write(buf.freeze())
            .await
            .map_err(std::io::Error::other)?;
    }
    Ok(total)
}

/// Uploads `reader` as one object on backends that only accept whole writes.
async fn write_once(
    operator: &Operator,
    key: &str,
    content_type: &str,
    reader: &mut ByteReader,
) -> std::io::Result<usize> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data).await?;
    let size = data.len();
    operator
        .write_with(key, data)
        .content_type(content_type)
        .await
        .map_err(std::io::Error::other)?;
    Ok(size)
}
