//! Resource server application state.

use tracing::info;

use aap_enforce::ConstraintEnforcer;
use aap_token::{decoding_key_from_pem, TokenValidator};

use crate::config::RsConfig;

/// Shared application state.
pub struct AppState {
    pub config: RsConfig,
    pub validator: TokenValidator,
    pub enforcer: ConstraintEnforcer,
}

impl AppState {
    /// Build state from disk, loading the issuer's public key.
    pub fn new(config: RsConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let public_pem = std::fs::read_to_string(&config.public_key_path).map_err(|e| {
            format!(
                "Failed to read public key at {}: {e}",
                config.public_key_path.display()
            )
        })?;
        let key = decoding_key_from_pem(config.signing_algorithm, &public_pem)?;

        let validator = TokenValidator::new(config.audience.clone(), config.trusted_issuers.clone())
            .with_key(config.key_id.clone(), key);

        info!(
            audience = %config.audience,
            trusted_issuers = ?config.trusted_issuers,
            "Resource server initialized"
        );

        Ok(Self::from_parts(config, validator))
    }

    /// Assemble state from an already-built validator.
    pub fn from_parts(config: RsConfig, validator: TokenValidator) -> Self {
        Self {
            config,
            validator,
            enforcer: ConstraintEnforcer::new(),
        }
    }
}
