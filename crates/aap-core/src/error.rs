//! The closed wire error taxonomy.
//!
//! Every failure either service can surface maps to exactly one code and one
//! HTTP status. HTTP adapters translate these into
//! `{error, error_description}` bodies; the core never retries.

use thiserror::Error;

/// Wire-level authorization errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AapError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    InvalidClient(String),
    #[error("{0}")]
    UnsupportedGrantType(String),
    #[error("{0}")]
    InvalidGrant(String),
    #[error("{0}")]
    InvalidToken(String),
    #[error("{0}")]
    InvalidCapability(String),
    #[error("{0}")]
    DomainNotAllowed(String),
    #[error("{0}")]
    InvalidTarget(String),
    #[error("{0}")]
    CapabilityExpired(String),
    #[error("{0}")]
    RateLimited(String),
    #[error("{0}")]
    MethodNotAllowed(String),
    #[error("{0}")]
    RequestTooLarge(String),
    #[error("{0}")]
    ApprovalRequired(String),
    #[error("{0}")]
    ExcessiveDelegation(String),
    #[error("{0}")]
    InvalidDelegationChain(String),
    #[error("{0}")]
    Internal(String),
}

impl AapError {
    /// Stable error code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::InvalidToken(_) => "invalid_token",
            Self::InvalidCapability(_) => "aap_invalid_capability",
            Self::DomainNotAllowed(_) => "aap_domain_not_allowed",
            Self::InvalidTarget(_) => "invalid_target",
            Self::CapabilityExpired(_) => "aap_capability_expired",
            Self::RateLimited(_) => "aap_rate_limit",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::RequestTooLarge(_) => "request_too_large",
            Self::ApprovalRequired(_) => "aap_approval_required",
            Self::ExcessiveDelegation(_) => "aap_excessive_delegation",
            Self::InvalidDelegationChain(_) => "aap_invalid_delegation_chain",
            Self::Internal(_) => "server_error",
        }
    }

    /// HTTP status the adapters respond with.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) | Self::UnsupportedGrantType(_) | Self::InvalidGrant(_) => 400,
            Self::InvalidClient(_) | Self::InvalidToken(_) => 401,
            Self::InvalidCapability(_)
            | Self::DomainNotAllowed(_)
            | Self::InvalidTarget(_)
            | Self::CapabilityExpired(_)
            | Self::ApprovalRequired(_)
            | Self::ExcessiveDelegation(_)
            | Self::InvalidDelegationChain(_) => 403,
            Self::MethodNotAllowed(_) => 405,
            Self::RequestTooLarge(_) => 413,
            Self::RateLimited(_) => 429,
            Self::Internal(_) => 500,
        }
    }

    /// Human-readable description for `error_description`.
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidRequest(d)
            | Self::InvalidClient(d)
            | Self::UnsupportedGrantType(d)
            | Self::InvalidGrant(d)
            | Self::InvalidToken(d)
            | Self::InvalidCapability(d)
            | Self::DomainNotAllowed(d)
            | Self::InvalidTarget(d)
            | Self::CapabilityExpired(d)
            | Self::RateLimited(d)
            | Self::MethodNotAllowed(d)
            | Self::RequestTooLarge(d)
            | Self::ApprovalRequired(d)
            | Self::ExcessiveDelegation(d)
            | Self::InvalidDelegationChain(d)
            | Self::Internal(d) => d,
        }
    }
}

/// Result type alias for AAP operations.
pub type AapResult<T> = Result<T, AapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses_match_the_taxonomy() {
        let cases = [
            (AapError::InvalidRequest("x".into()), "invalid_request", 400),
            (AapError::InvalidClient("x".into()), "invalid_client", 401),
            (AapError::InvalidGrant("x".into()), "invalid_grant", 400),
            (AapError::InvalidToken("x".into()), "invalid_token", 401),
            (
                AapError::InvalidCapability("x".into()),
                "aap_invalid_capability",
                403,
            ),
            (
                AapError::DomainNotAllowed("x".into()),
                "aap_domain_not_allowed",
                403,
            ),
            (AapError::RateLimited("x".into()), "aap_rate_limit", 429),
            (
                AapError::MethodNotAllowed("x".into()),
                "method_not_allowed",
                405,
            ),
            (
                AapError::RequestTooLarge("x".into()),
                "request_too_large",
                413,
            ),
            (
                AapError::ApprovalRequired("x".into()),
                "aap_approval_required",
                403,
            ),
            (
                AapError::ExcessiveDelegation("x".into()),
                "aap_excessive_delegation",
                403,
            ),
            (
                AapError::InvalidDelegationChain("x".into()),
                "aap_invalid_delegation_chain",
                403,
            ),
            (AapError::Internal("x".into()), "server_error", 500),
        ];

        for (error, code, status) in cases {
            assert_eq!(error.code(), code);
            assert_eq!(error.status(), status);
            assert_eq!(error.description(), "x");
        }
    }
}
