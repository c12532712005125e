//! Authorization server application state.

use std::sync::Arc;

use tracing::{info, warn};

use aap_policy::{PolicyDefaults, PolicyEngine};
use aap_token::{IssuerOptions, JwkSet, SigningKey, TokenIssuer};

use crate::clients::{ClientAuthenticator, StaticSecretAuthenticator};
use crate::config::AsConfig;

/// Shared application state.
pub struct AppState {
    pub config: AsConfig,
    pub issuer: TokenIssuer,
    pub jwks: JwkSet,
    pub clients: Arc<dyn ClientAuthenticator>,
}

impl AppState {
    /// Build state from disk: policy directory and PEM key files.
    pub fn new(config: AsConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let engine = PolicyEngine::load(
            &config.policy_path,
            PolicyDefaults {
                token_lifetime: config.default_token_lifetime,
                max_delegation_depth: config.default_max_delegation_depth,
            },
        );

        let key = SigningKey::from_pem_files(
            config.key_id.clone(),
            config.signing_algorithm,
            &config.private_key_path,
            &config.public_key_path,
        )?;

        info!(
            issuer = %config.issuer,
            kid = %config.key_id,
            algorithm = %config.signing_algorithm,
            "Authorization server initialized"
        );

        Ok(Self::from_parts(
            config,
            engine,
            key,
            Arc::new(StaticSecretAuthenticator::default()),
        ))
    }

    /// Assemble state from already-built components.
    pub fn from_parts(
        config: AsConfig,
        engine: PolicyEngine,
        key: SigningKey,
        clients: Arc<dyn ClientAuthenticator>,
    ) -> Self {
        let jwks = match key.to_jwk() {
            Ok(jwk) => JwkSet { keys: vec![jwk] },
            Err(e) => {
                warn!(error = %e, "Failed to export JWK; serving an empty key set");
                JwkSet { keys: Vec::new() }
            }
        };
        let issuer = TokenIssuer::new(
            Arc::new(engine),
            key,
            config.issuer.clone(),
            IssuerOptions {
                lifetime_reduction: config.delegated_lifetime_reduction,
                default_max_delegation_depth: config.default_max_delegation_depth,
            },
        );

        Self {
            config,
            issuer,
            jwks,
            clients,
        }
    }
}
