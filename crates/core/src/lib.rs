//! File storage backed by Azure Blob Storage.
//!
//! # Modules
//!
//! - `storage` - Generic file storage contract, locator and key generation
//! - `azure` - Azure Blob Storage backend and blob service clients
//! - `management` - Operator-triggered refresh of storage backends
//! - `clock` - Time source for storage keys

pub mod azure;
pub mod clock;
pub mod management;
pub mod storage;

pub use azure::AzureFileStorage;
pub use management::StorageManagementFacade;
pub use storage::{FileStorage, FileStorageLocator, RefreshableStorage, StorageError};
