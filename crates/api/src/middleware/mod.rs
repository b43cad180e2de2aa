//! Request middleware.

pub mod auth;

pub use auth::management_auth;
