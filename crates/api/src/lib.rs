//! HTTP management channel with Axum routes and middleware.
//!
//! This crate provides:
//! - Storage refresh routes under `/management/azurefs`
//! - Bearer token middleware guarding the management routes
//! - JSON error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::header::AUTHORIZATION;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use azurefs_core::StorageManagementFacade;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Refresh operations over the registered storages.
    pub facade: Arc<StorageManagementFacade>,
    /// Bearer token required by the management routes, if any.
    pub management_token: Option<Arc<str>>,
}

impl AppState {
    /// Create state without a management token.
    #[must_use]
    pub fn new(facade: Arc<StorageManagementFacade>) -> Self {
        Self {
            facade,
            management_token: None,
        }
    }

    /// Require `token` on the management routes. Empty tokens are ignored.
    #[must_use]
    pub fn with_management_token(mut self, token: Option<String>) -> Self {
        self.management_token = token.filter(|t| !t.is_empty()).map(Arc::from);
        self
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::app_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetSensitiveRequestHeadersLayer::new([AUTHORIZATION]))
        .with_state(state)
}
