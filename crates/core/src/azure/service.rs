//! Blob service abstraction: account-level operations and container handles.

use std::sync::Arc;

use async_trait::async_trait;
use opendal::Operator;
use thiserror::Error;

use crate::storage::StorageError;

/// Account-level blob service errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The container already exists.
    #[error("container '{0}' already exists")]
    ContainerAlreadyExists(String),

    /// The service answered with an error status.
    #[error("blob service returned HTTP {status}: {code}")]
    Request {
        /// HTTP status code.
        status: u16,
        /// Value of the `x-ms-error-code` header, empty when absent.
        code: String,
    },

    /// The request did not complete.
    #[error("blob service request failed: {0}")]
    Transport(String),

    /// The container client could not be built.
    #[error("invalid container configuration: {0}")]
    Configuration(String),
}

impl ServiceError {
    /// Service error code, for logs.
    #[must_use]
    pub fn error_code(&self) -> &str {
        match self {
            Self::ContainerAlreadyExists(_) => "ContainerAlreadyExists",
            Self::Request { code, .. } if !code.is_empty() => code,
            Self::Request { .. } => "RequestFailed",
            Self::Transport(_) => "TransportFailed",
            Self::Configuration(_) => "InvalidConfiguration",
        }
    }
}

/// Handle to one remote container.
#[derive(Debug, Clone)]
pub struct ContainerHandle {
    name: String,
    operator: Operator,
}

impl ContainerHandle {
    /// Wraps an operator rooted at the container.
    #[must_use]
    pub fn new(name: impl Into<String>, operator: Operator) -> Self {
        Self {
            name: name.into(),
            operator,
        }
    }

    /// Container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operator performing blob data operations in the container.
    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

/// A connected storage account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Creates the container and returns a handle to it.
    async fn create_container(&self, name: &str) -> Result<ContainerHandle, ServiceError>;

    /// Attaches to an existing container.
    fn container(&self, name: &str) -> Result<ContainerHandle, ServiceError>;
}

/// Opens a [`BlobService`] for a connection string.
pub trait BlobServiceConnector: Send + Sync {
    /// Connects to the account described by `connection_string`.
    fn connect(&self, connection_string: &str) -> Result<Arc<dyn BlobService>, StorageError>;
}
