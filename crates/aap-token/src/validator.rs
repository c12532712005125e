//! Resource-side token validation.
//!
//! Ordered checks over the envelope, standard claims, agent/task shape, and
//! delegation-chain invariants. Pure: validation has no side effects and
//! returns the parsed claims.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::debug;

use aap_core::{AapError, AapResult, RequestContext, TokenClaims};

use crate::keys::SigningAlgorithm;

/// Default clock-skew leeway in seconds.
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 300;

/// Validates tokens presented to a resource server.
pub struct TokenValidator {
    keys: Vec<(Option<String>, DecodingKey)>,
    audience: String,
    trusted_issuers: Vec<String>,
    algorithms: Vec<SigningAlgorithm>,
    clock_skew_secs: u64,
}

impl TokenValidator {
    pub fn new(audience: impl Into<String>, trusted_issuers: Vec<String>) -> Self {
        Self {
            keys: Vec::new(),
            audience: audience.into(),
            trusted_issuers,
            algorithms: vec![SigningAlgorithm::ES256, SigningAlgorithm::RS256],
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
        }
    }

    /// Register a verification key selected by the `kid` header.
    pub fn with_key(mut self, kid: impl Into<String>, key: DecodingKey) -> Self {
        self.keys.push((Some(kid.into()), key));
        self
    }

    /// Register a fallback key used when the header carries no known `kid`.
    pub fn with_default_key(mut self, key: DecodingKey) -> Self {
        self.keys.push((None, key));
        self
    }

    /// Restrict the accepted signing algorithms.
    pub fn with_algorithms(mut self, algorithms: Vec<SigningAlgorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn with_clock_skew(mut self, clock_skew_secs: u64) -> Self {
        self.clock_skew_secs = clock_skew_secs;
        self
    }

    /// Validate a token, returning its claims.
    ///
    /// The request context is accepted for task-binding extensions; the
    /// reference validation does not inspect it.
    pub fn validate(
        &self,
        token: &str,
        _request: Option<&RequestContext>,
    ) -> AapResult<TokenClaims> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| AapError::InvalidToken(format!("Malformed token: {e}")))?;

        if !self
            .algorithms
            .iter()
            .any(|a| Algorithm::from(*a) == header.alg)
        {
            return Err(AapError::InvalidToken(
                "Token signing algorithm is not allowed".to_string(),
            ));
        }

        let key = self.resolve_key(header.kid.as_deref())?;

        // The allowlist is enforced above; validating against the header's
        // own algorithm keeps the key-family check exact.
        let mut validation = Validation::new(header.alg);
        validation.leeway = self.clock_skew_secs;
        validation.set_audience(&[self.audience.as_str()]);

        let claims = jsonwebtoken::decode::<TokenClaims>(token, key, &validation)
            .map_err(map_decode_error)?
            .claims;

        if !self.trusted_issuers.iter().any(|iss| iss == &claims.iss) {
            return Err(AapError::InvalidToken(
                "Token issuer is not trusted".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        if claims.iat > now + self.clock_skew_secs as i64 {
            return Err(AapError::InvalidToken(
                "Token issued in the future".to_string(),
            ));
        }
        if claims.exp <= claims.iat {
            return Err(AapError::InvalidToken(
                "Token expiry does not follow issuance".to_string(),
            ));
        }

        self.validate_agent(&claims)?;
        self.validate_task(&claims)?;

        if claims.capabilities.is_empty() {
            return Err(AapError::InvalidToken(
                "Token grants no capabilities".to_string(),
            ));
        }

        self.validate_delegation(&claims)?;

        debug!(jti = %claims.jti, sub = %claims.sub, "Token validated");
        Ok(claims)
    }

    fn resolve_key(&self, kid: Option<&str>) -> AapResult<&DecodingKey> {
        if let Some(kid) = kid {
            if let Some((_, key)) = self
                .keys
                .iter()
                .find(|(candidate, _)| candidate.as_deref() == Some(kid))
            {
                return Ok(key);
            }
        }

        self.keys
            .iter()
            .find(|(candidate, _)| candidate.is_none())
            .or_else(|| {
                if self.keys.len() == 1 {
                    self.keys.first()
                } else {
                    None
                }
            })
            .map(|(_, key)| key)
            .ok_or_else(|| {
                AapError::InvalidToken("No verification key for token key id".to_string())
            })
    }

    fn validate_agent(&self, claims: &TokenClaims) -> AapResult<()> {
        if claims.agent.id.is_empty() {
            return Err(AapError::InvalidToken(
                "Agent claim missing required 'id' field".to_string(),
            ));
        }
        if claims.agent.agent_type.is_empty() {
            return Err(AapError::InvalidToken(
                "Agent claim missing required 'type' field".to_string(),
            ));
        }
        if claims.agent.operator.is_empty() {
            return Err(AapError::InvalidToken(
                "Agent claim missing required 'operator' field".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_task(&self, claims: &TokenClaims) -> AapResult<()> {
        if claims.task.id.is_empty() {
            return Err(AapError::InvalidToken(
                "Task claim missing required 'id' field".to_string(),
            ));
        }
        if claims.task.purpose.is_empty() {
            return Err(AapError::InvalidToken(
                "Task claim missing required 'purpose' field".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_delegation(&self, claims: &TokenClaims) -> AapResult<()> {
        // Tokens without a delegation claim are originals at depth 0.
        let Some(delegation) = &claims.delegation else {
            return Ok(());
        };

        let (Some(depth), Some(max_depth)) = (delegation.depth, delegation.max_depth) else {
            return Err(AapError::InvalidDelegationChain(
                "Delegation claim missing required depth or max_depth".to_string(),
            ));
        };

        if depth > max_depth {
            return Err(AapError::ExcessiveDelegation(
                "Delegation depth exceeds maximum allowed depth".to_string(),
            ));
        }

        if delegation.chain.len() as u64 != depth as u64 + 1 {
            return Err(AapError::InvalidDelegationChain(format!(
                "Delegation chain length ({}) does not match depth+1 ({})",
                delegation.chain.len(),
                depth + 1
            )));
        }

        Ok(())
    }
}

fn map_decode_error(error: jsonwebtoken::errors::Error) -> AapError {
    use jsonwebtoken::errors::ErrorKind;

    let description = match error.kind() {
        ErrorKind::ExpiredSignature => "Token has expired".to_string(),
        ErrorKind::ImmatureSignature => "Token is not yet valid".to_string(),
        ErrorKind::InvalidAudience => {
            "Token audience does not match this resource server".to_string()
        }
        ErrorKind::InvalidSignature => "Token signature verification failed".to_string(),
        ErrorKind::InvalidAlgorithm => "Token signing algorithm is not allowed".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => {
            format!("Token missing required claim: {claim}")
        }
        ErrorKind::Json(_) => format!("Token payload is malformed: {error}"),
        _ => format!("Token validation failed: {error}"),
    };

    AapError::InvalidToken(description)
}
