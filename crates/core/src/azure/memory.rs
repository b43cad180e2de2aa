//! In-process blob service backed by the OpenDAL memory service.
//!
//! Accounts are keyed by blob endpoint, so two connection strings naming the
//! same account share containers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use opendal::{Operator, services};

use super::connection::ConnectionString;
use super::service::{BlobService, BlobServiceConnector, ContainerHandle, ServiceError};
use crate::storage::StorageError;

/// In-memory storage account.
#[derive(Debug, Default)]
pub struct MemoryBlobService {
    containers: Mutex<HashMap<String, Operator>>,
}

impl MemoryBlobService {
    /// Names of the created containers, sorted.
    #[must_use]
    pub fn container_names(&self) -> Vec<String> {
        let containers = self.containers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = containers.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl BlobService for MemoryBlobService {
    async fn create_container(&self, name: &str) -> Result<ContainerHandle, ServiceError> {
        let mut containers = self.containers.lock().unwrap_or_else(PoisonError::into_inner);
        if containers.contains_key(name) {
            return Err(ServiceError::ContainerAlreadyExists(name.to_string()));
        }
        let operator = Operator::new(services::Memory::default())
            .map_err(|e| ServiceError::Configuration(e.to_string()))?
            .finish();
        containers.insert(name.to_string(), operator.clone());
        Ok(ContainerHandle::new(name, operator))
    }

    fn container(&self, name: &str) -> Result<ContainerHandle, ServiceError> {
        let containers = self.containers.lock().unwrap_or_else(PoisonError::into_inner);
        containers
            .get(name)
            .map(|operator| ContainerHandle::new(name, operator.clone()))
            .ok_or_else(|| ServiceError::Request {
                status: 404,
                code: "ContainerNotFound".to_string(),
            })
    }
}

/// Connector handing out in-memory accounts.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    accounts: Mutex<HashMap<String, Arc<MemoryBlobService>>>,
}

impl MemoryConnector {
    /// Create a connector without accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The account previously connected with `connection_string`.
    #[must_use]
    pub fn account(&self, connection_string: &str) -> Option<Arc<MemoryBlobService>> {
        let key = ConnectionString::parse(connection_string)
            .ok()?
            .blob_endpoint()
            .to_string();
        let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts.get(&key).cloned()
    }
}

impl BlobServiceConnector for MemoryConnector {
    fn connect(&self, connection_string: &str) -> Result<Arc<dyn BlobService>, StorageError> {
        let key = ConnectionString::parse(connection_string)?
            .blob_endpoint()
            .to_string();
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let account = accounts.entry(key).or_default();
        Ok(Arc::clone(account) as Arc<dyn BlobService>)
    }
}
