//! Route definitions for the resource server.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{create_draft, publish, search, service_info};
use crate::state::AppState;

/// Build the router with all endpoints.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/api/search", get(search))
        .route("/api/cms/draft", post(create_draft))
        .route("/api/cms/publish", post(publish))
        .with_state(state)
}
