//! Common types used across the application.

pub mod file_ref;

pub use file_ref::FileRef;
