//! Shared types, errors, and configuration for azurefs.
//!
//! This crate provides common types used across all other crates:
//! - File references handed out by storage backends
//! - Application-wide error types for the management channel
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, ManagementConfig, ServerConfig, SettingsError, SettingsUpdate, StorageSettings,
};
pub use error::AppError;
pub use types::FileRef;
