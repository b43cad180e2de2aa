//! Azure Blob Storage backend.
//!
//! [`AzureFileStorage`] keeps the active container handle in an atomically
//! swappable slot. Account access goes through a [`BlobServiceConnector`]:
//! [`AzureConnector`] talks to a real account, [`MemoryConnector`] keeps
//! everything in process.

pub mod connection;
mod file_storage;
pub mod memory;
pub mod rest;
pub mod service;

pub use connection::{ConnectionString, Credential};
pub use file_storage::AzureFileStorage;
pub use memory::{MemoryBlobService, MemoryConnector};
pub use rest::{AzureBlobService, AzureConnector};
pub use service::{BlobService, BlobServiceConnector, ContainerHandle, ServiceError};
