//! Application configuration management.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Management server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Azure file storage settings.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Management channel configuration.
    #[serde(default)]
    pub management: ManagementConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Management channel configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManagementConfig {
    /// Bearer token required on management calls. Open when unset.
    #[serde(default)]
    pub token: Option<String>,
}

/// Connection settings of an Azure file storage.
///
/// Validated lazily: [`StorageSettings::validate`] runs when the storage
/// (re)connects, never at construction.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct StorageSettings {
    /// Name the storage is registered under.
    #[serde(default = "default_storage_name")]
    pub storage_name: String,
    /// Azure Storage connection string.
    #[serde(default)]
    pub connection_string: String,
    /// Azure Storage container name.
    #[serde(default)]
    pub container_name: String,
    /// The block size (chunk size) to transfer at a time.
    #[serde(default = "default_block_size")]
    pub block_size: u64,
    /// The maximum number of parallel requests issued as part of a single transfer.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Fail the connect call when the container can be neither created nor attached.
    #[serde(default)]
    pub strict_startup: bool,
}

fn default_storage_name() -> String {
    StorageSettings::DEFAULT_STORAGE_NAME.to_string()
}

fn default_block_size() -> u64 {
    StorageSettings::DEFAULT_BLOCK_SIZE
}

fn default_max_concurrency() -> usize {
    StorageSettings::DEFAULT_MAX_CONCURRENCY
}

impl StorageSettings {
    /// Default storage name.
    pub const DEFAULT_STORAGE_NAME: &'static str = "azurefs";
    /// Default block size: 1MB.
    pub const DEFAULT_BLOCK_SIZE: u64 = 1_048_576;
    /// Default number of parallel requests per transfer.
    pub const DEFAULT_MAX_CONCURRENCY: usize = 2;

    /// Creates settings for a connection string and container with default transfer options.
    #[must_use]
    pub fn new(connection_string: impl Into<String>, container_name: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            container_name: container_name.into(),
            ..Self::default()
        }
    }

    /// Set the storage name.
    #[must_use]
    pub fn with_storage_name(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = storage_name.into();
        self
    }

    /// Set transfer block size and concurrency.
    #[must_use]
    pub fn with_transfer(mut self, block_size: u64, max_concurrency: usize) -> Self {
        self.block_size = block_size;
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set strict startup.
    #[must_use]
    pub fn with_strict_startup(mut self, strict: bool) -> Self {
        self.strict_startup = strict;
        self
    }

    /// Checks the fields required before any remote call.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.connection_string.trim().is_empty() {
            return Err(SettingsError::EmptyConnectionString);
        }
        if self.container_name.trim().is_empty() {
            return Err(SettingsError::EmptyContainerName);
        }
        if self.block_size == 0 {
            return Err(SettingsError::InvalidBlockSize);
        }
        if self.max_concurrency == 0 {
            return Err(SettingsError::InvalidMaxConcurrency);
        }
        Ok(())
    }

    /// Returns a copy with the operator overrides applied.
    #[must_use]
    pub fn updated(&self, update: &SettingsUpdate) -> Self {
        let mut next = self.clone();
        next.connection_string.clone_from(&update.connection_string);
        next.container_name.clone_from(&update.container_name);
        if let Some(block_size) = update.block_size {
            next.block_size = block_size;
        }
        if let Some(max_concurrency) = update.max_concurrency {
            next.max_concurrency = max_concurrency;
        }
        next
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            storage_name: default_storage_name(),
            connection_string: String::new(),
            container_name: String::new(),
            block_size: default_block_size(),
            max_concurrency: default_max_concurrency(),
            strict_startup: false,
        }
    }
}

impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("storage_name", &self.storage_name)
            .field("connection_string", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("block_size", &self.block_size)
            .field("max_concurrency", &self.max_concurrency)
            .field("strict_startup", &self.strict_startup)
            .finish()
    }
}

/// Operator-supplied overrides applied before a client refresh.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SettingsUpdate {
    /// New connection string.
    pub connection_string: String,
    /// New container name.
    pub container_name: String,
    /// New block size, kept when absent.
    #[serde(default)]
    pub block_size: Option<u64>,
    /// New concurrency, kept when absent.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl fmt::Debug for SettingsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsUpdate")
            .field("connection_string", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("block_size", &self.block_size)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

/// Invalid storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Connection string missing.
    #[error("connectionString must not be empty")]
    EmptyConnectionString,
    /// Container name missing.
    #[error("containerName must not be empty")]
    EmptyContainerName,
    /// Block size of zero.
    #[error("blockSize must be positive")]
    InvalidBlockSize,
    /// Concurrency of zero.
    #[error("maxConcurrency must be positive")]
    InvalidMaxConcurrency,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("AZUREFS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_storage_settings_defaults() {
        let settings = StorageSettings::default();
        assert_eq!(settings.storage_name, "azurefs");
        assert_eq!(settings.block_size, 1_048_576);
        assert_eq!(settings.max_concurrency, 2);
        assert!(!settings.strict_startup);
        assert!(settings.connection_string.is_empty());
    }

    #[rstest]
    #[case(StorageSettings::new("", "docs"), SettingsError::EmptyConnectionString)]
    #[case(StorageSettings::new("  ", "docs"), SettingsError::EmptyConnectionString)]
    #[case(StorageSettings::new("AccountName=a", ""), SettingsError::EmptyContainerName)]
    #[case(
        StorageSettings::new("AccountName=a", "docs").with_transfer(0, 2),
        SettingsError::InvalidBlockSize
    )]
    #[case(
        StorageSettings::new("AccountName=a", "docs").with_transfer(1024, 0),
        SettingsError::InvalidMaxConcurrency
    )]
    fn test_validate_rejects(#[case] settings: StorageSettings, #[case] expected: SettingsError) {
        assert_eq!(settings.validate(), Err(expected));
    }

    #[test]
    fn test_validate_accepts() {
        assert!(StorageSettings::new("AccountName=a", "docs").validate().is_ok());
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            SettingsError::EmptyConnectionString.to_string(),
            "connectionString must not be empty"
        );
        assert_eq!(
            SettingsError::EmptyContainerName.to_string(),
            "containerName must not be empty"
        );
    }

    #[test]
    fn test_updated_keeps_transfer_when_absent() {
        let settings = StorageSettings::new("old", "old-container").with_transfer(4096, 8);
        let update = SettingsUpdate {
            connection_string: "new".to_string(),
            container_name: "new-container".to_string(),
            block_size: None,
            max_concurrency: None,
        };
        let next = settings.updated(&update);
        assert_eq!(next.connection_string, "new");
        assert_eq!(next.container_name, "new-container");
        assert_eq!(next.block_size, 4096);
        assert_eq!(next.max_concurrency, 8);
    }

    #[test]
    fn test_updated_overrides_transfer() {
        let settings = StorageSettings::new("old", "old-container");
        let update = SettingsUpdate {
            connection_string: "new".to_string(),
            container_name: "new-container".to_string(),
            block_size: Some(2048),
            max_concurrency: Some(4),
        };
        let next = settings.updated(&update);
        assert_eq!(next.block_size, 2048);
        assert_eq!(next.max_concurrency, 4);
    }

    #[test]
    fn test_debug_redacts_connection_string() {
        let settings = StorageSettings::new("AccountKey=secret", "docs");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("docs"));
    }

    #[test]
    fn test_load_defaults_without_sources() {
        temp_env::with_vars_unset(
            [
                "AZUREFS__STORAGE__CONNECTION_STRING",
                "AZUREFS__STORAGE__CONTAINER_NAME",
                "AZUREFS__SERVER__PORT",
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(config.server.port, 9090);
                assert_eq!(config.storage.block_size, StorageSettings::DEFAULT_BLOCK_SIZE);
                assert!(config.management.token.is_none());
            },
        );
    }

    #[test]
    fn test_load_storage_from_env() {
        temp_env::with_vars(
            [
                (
                    "AZUREFS__STORAGE__CONNECTION_STRING",
                    Some("UseDevelopmentStorage=true"),
                ),
                ("AZUREFS__STORAGE__CONTAINER_NAME", Some("docs")),
                ("AZUREFS__STORAGE__MAX_CONCURRENCY", Some("4")),
            ],
            || {
                let config = AppConfig::load().expect("config should load");
                assert_eq!(
                    config.storage.connection_string,
                    "UseDevelopmentStorage=true"
                );
                assert_eq!(config.storage.container_name, "docs");
                assert_eq!(config.storage.max_concurrency, 4);
                assert_eq!(config.storage.block_size, 1_048_576);
            },
        );
    }
}
