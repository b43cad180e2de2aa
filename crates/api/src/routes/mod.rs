//! Route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::management_auth};

pub mod health;
pub mod management;

/// Creates the router with public and token-protected routes.
pub fn app_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = Router::new()
        .nest("/management/azurefs", management::routes())
        .layer(middleware::from_fn_with_state(state, management_auth));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
