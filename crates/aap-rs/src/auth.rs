//! Bearer extraction and the authorize pipeline.

use axum::http::{header, HeaderMap};
use tracing::debug;

use aap_core::{AapError, AapResult, RequestContext, TokenClaims};
use aap_enforce::{check_oversight, require_capability};

use crate::state::AppState;

/// Pull the bearer token out of the Authorization header.
pub fn extract_bearer_token(headers: &HeaderMap) -> AapResult<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AapError::InvalidToken("Missing or invalid Authorization header".to_string())
        })
}

/// Authorize a protected request.
///
/// Runs validate, capability match, constraint enforcement, and the
/// oversight gate in order, yielding the token claims on success.
pub fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    context: RequestContext,
) -> AapResult<TokenClaims> {
    let token = extract_bearer_token(headers)?;

    let claims = state.validator.validate(token, Some(&context))?;

    let capability = require_capability(&claims.capabilities, &context.action)?;
    state
        .enforcer
        .enforce(&capability.constraints, &context, &claims.jti)?;

    check_oversight(claims.oversight.as_ref(), &context.action)?;

    debug!(jti = %claims.jti, action = %context.action, "Request authorized");
    Ok(claims)
}

/// Declared content length of the request, defaulting to zero.
pub fn content_length(headers: &HeaderMap) -> u64 {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}
