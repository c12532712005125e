//! Protected endpoint handlers.
//!
//! The endpoints are the reference surface showing the authorize pipeline in
//! front of business logic; real deployments replace them wholesale.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, Method},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use aap_core::RequestContext;

use crate::auth::{authorize, content_length};
use crate::error::ApiError;
use crate::state::AppState;

/// Resource server information.
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "AAP Resource Server",
        "version": env!("CARGO_PKG_VERSION"),
        "audience": state.config.audience,
        "trusted_issuers": state.config.trusted_issuers,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub url: Option<String>,
}

/// `GET /api/search` - web search under the `search.web` capability.
pub async fn search(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let target_url = params
        .url
        .clone()
        .unwrap_or_else(|| "https://example.org".to_string());

    let context = RequestContext::new("search.web", method.as_str())
        .with_content_length(content_length(&headers))
        .with_target_url(target_url.clone());

    let payload = authorize(&state, &headers, context)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Search authorized",
        "query": params.q,
        "target_url": target_url,
        "agent": payload.agent.id,
        "task": payload.task.id,
    })))
}

/// `POST /api/cms/draft` - create a draft under `cms.create_draft`.
pub async fn create_draft(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let context = RequestContext::new("cms.create_draft", method.as_str())
        .with_content_length(content_length(&headers));

    let payload = authorize(&state, &headers, context)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Draft created",
        "draft_id": "draft-12345",
        "agent": payload.agent.id,
        "task": payload.task.id,
    })))
}

/// `POST /api/cms/publish` - publish content under `cms.publish`.
///
/// Policies typically list this action under oversight, so the authorize
/// pipeline refuses it with the approval reference.
pub async fn publish(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let context = RequestContext::new("cms.publish", method.as_str())
        .with_content_length(content_length(&headers));

    authorize(&state, &headers, context)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Content published",
    })))
}
