//! Storage error types.

use thiserror::Error;

use azurefs_shared::SettingsError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Required setting missing or malformed at connect time.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Container could neither be created nor attached (strict startup only).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Save, load or delete failed; the message names the affected file.
    #[error("{message}")]
    Io {
        /// Human-readable message.
        message: String,
        /// Underlying transport error, absent when no client was connected.
        #[source]
        source: Option<BoxError>,
    },
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an I/O error without an underlying cause.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error wrapping a transport failure.
    #[must_use]
    pub fn io_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this is an I/O failure.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

impl From<SettingsError> for StorageError {
    fn from(err: SettingsError) -> Self {
        Self::Configuration(err.to_string())
    }
}
