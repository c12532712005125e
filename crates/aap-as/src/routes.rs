//! Route definitions for the authorization server.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{jwks, oauth_metadata, service_info, token};
use crate::state::AppState;

/// Build the router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/token", post(token))
        .route("/.well-known/oauth-authorization-server", get(oauth_metadata))
        .route("/.well-known/jwks.json", get(jwks))
        .with_state(state)
}
