//! HTTP request handlers for the authorization server.

use axum::{extract::State, Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use aap_core::AapError;
use aap_token::{InitialGrant, JwkSet};

use crate::error::ApiError;
use crate::state::AppState;

/// RFC 8693 token-exchange grant type.
pub const TOKEN_EXCHANGE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
/// RFC 8693 access-token token type.
pub const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

/// Form parameters of `POST /token`, covering both grants.
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    // client_credentials
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub agent_type: Option<String>,
    pub operator: Option<String>,
    pub task_id: Option<String>,
    pub task_purpose: Option<String>,
    pub audience: Option<String>,
    /// Comma-separated action names.
    pub capabilities: Option<String>,
    /// JSON blob; parse failures are ignored.
    pub agent_metadata: Option<String>,
    pub task_metadata: Option<String>,
    // token-exchange
    pub subject_token: Option<String>,
    pub subject_token_type: Option<String>,
    /// New audience for the derived token.
    pub resource: Option<String>,
    /// Comma-separated capability subset.
    pub scope: Option<String>,
}

/// Successful token endpoint response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_token_type: Option<String>,
}

/// Token endpoint: dispatches on `grant_type`.
pub async fn token(
    State(state): State<Arc<AppState>>,
    Form(request): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let grant_type = request.grant_type.clone();
    match grant_type.as_deref() {
        Some("client_credentials") => handle_client_credentials(&state, request).await,
        Some(TOKEN_EXCHANGE_GRANT_TYPE) => handle_token_exchange(&state, request).await,
        other => Err(AapError::UnsupportedGrantType(format!(
            "Grant type '{}' is not supported",
            other.unwrap_or_default()
        ))
        .into()),
    }
}

async fn handle_client_credentials(
    state: &AppState,
    request: TokenRequest,
) -> Result<Json<TokenResponse>, ApiError> {
    let client_id = request.client_id.unwrap_or_default();
    let client_secret = request.client_secret.unwrap_or_default();

    if client_id.is_empty() || client_secret.is_empty() {
        return Err(AapError::InvalidClient("Client authentication failed".to_string()).into());
    }
    if !state.clients.authenticate(&client_id, &client_secret) {
        warn!(client_id = %client_id, "Client authentication rejected");
        return Err(AapError::InvalidClient("Invalid client credentials".to_string()).into());
    }

    let grant = InitialGrant {
        agent_id: client_id,
        agent_type: request
            .agent_type
            .unwrap_or_else(|| "llm-autonomous".to_string()),
        operator: request.operator.unwrap_or_else(|| "org:default".to_string()),
        task_id: request.task_id.unwrap_or_else(|| "task-default".to_string()),
        task_purpose: request
            .task_purpose
            .unwrap_or_else(|| "general".to_string()),
        requested_actions: split_actions(
            request.capabilities.as_deref().unwrap_or("search.web"),
        ),
        audience: request
            .audience
            .unwrap_or_else(|| "https://api.example.com".to_string()),
        agent_metadata: parse_metadata(request.agent_metadata.as_deref()),
        task_metadata: parse_metadata(request.task_metadata.as_deref()),
    };

    let issued = state.issuer.issue_initial(grant).map_err(AapError::from)?;

    info!(jti = %issued.claims.jti, sub = %issued.claims.sub, "Token issued");
    Ok(Json(TokenResponse {
        expires_in: issued.expires_in(),
        scope: Some(format!("aap:{}", issued.claims.task.purpose)),
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        issued_token_type: None,
    }))
}

async fn handle_token_exchange(
    state: &AppState,
    request: TokenRequest,
) -> Result<Json<TokenResponse>, ApiError> {
    let subject_token = request
        .subject_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AapError::InvalidRequest("subject_token is required".to_string()))?;

    if request.subject_token_type.as_deref() != Some(ACCESS_TOKEN_TYPE) {
        return Err(
            AapError::InvalidRequest("subject_token_type must be access_token".to_string()).into(),
        );
    }

    let resource = request
        .resource
        .filter(|resource| !resource.is_empty())
        .ok_or_else(|| {
            AapError::InvalidRequest("resource (new audience) is required".to_string())
        })?;

    let subset: Option<Vec<String>> = request
        .scope
        .as_deref()
        .filter(|scope| !scope.is_empty())
        .map(split_actions);

    let issued = state
        .issuer
        .issue_derived(&subject_token, &resource, subset.as_deref())
        .map_err(AapError::from)?;

    info!(jti = %issued.claims.jti, audience = %resource, "Token exchanged");
    Ok(Json(TokenResponse {
        expires_in: issued.expires_in(),
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        scope: None,
        issued_token_type: Some(ACCESS_TOKEN_TYPE.to_string()),
    }))
}

/// Server information document.
pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "AAP Authorization Server",
        "version": env!("CARGO_PKG_VERSION"),
        "issuer": state.config.issuer,
        "endpoints": {
            "token": "/token",
            "jwks": "/.well-known/jwks.json",
            "metadata": "/.well-known/oauth-authorization-server",
        },
    }))
}

/// OAuth 2.0 Authorization Server Metadata (RFC 8414).
pub async fn oauth_metadata(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let issuer = &state.config.issuer;
    Json(serde_json::json!({
        "issuer": issuer,
        "token_endpoint": format!("{issuer}/token"),
        "jwks_uri": format!("{issuer}/.well-known/jwks.json"),
        "grant_types_supported": ["client_credentials", TOKEN_EXCHANGE_GRANT_TYPE],
        "token_endpoint_auth_methods_supported": ["client_secret_basic", "client_secret_post"],
        "response_types_supported": [],
        "scopes_supported": ["aap:research", "aap:content-creation", "aap:data-analysis"],
    }))
}

/// JSON Web Key Set endpoint.
pub async fn jwks(State(state): State<Arc<AppState>>) -> Json<JwkSet> {
    Json(state.jwks.clone())
}

fn split_actions(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|action| !action.is_empty())
        .map(|action| action.to_string())
        .collect()
}

fn parse_metadata(value: Option<&str>) -> Option<serde_json::Value> {
    value.and_then(|raw| serde_json::from_str(raw).ok())
}
