//! Authorization server configuration.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use aap_token::SigningAlgorithm;

/// Authorization server settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AsConfig {
    /// `iss` value and self-URL base.
    pub issuer: String,
    pub host: String,
    pub port: u16,
    /// Fallback token lifetime when a policy omits one.
    pub default_token_lifetime: u64,
    /// Multiplier (0..1) for derived-token lifetime.
    pub delegated_lifetime_reduction: f64,
    pub signing_algorithm: SigningAlgorithm,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub key_id: String,
    /// Directory of policy JSON files.
    pub policy_path: PathBuf,
    pub default_max_delegation_depth: u32,
}

impl Default for AsConfig {
    fn default() -> Self {
        Self {
            issuer: "https://as.example.com".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            default_token_lifetime: 3600,
            delegated_lifetime_reduction: 0.5,
            signing_algorithm: SigningAlgorithm::ES256,
            private_key_path: PathBuf::from("keys/as_private_key.pem"),
            public_key_path: PathBuf::from("keys/as_public_key.pem"),
            key_id: "aap-as-key-1".to_string(),
            policy_path: PathBuf::from("policies"),
            default_max_delegation_depth: 2,
        }
    }
}

impl AsConfig {
    /// Read settings from `AAP_*` environment variables, falling back to the
    /// defaults above.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            issuer: env_string("AAP_ISSUER", defaults.issuer),
            host: env_string("AAP_AS_HOST", defaults.host),
            port: env_parse("AAP_AS_PORT", defaults.port),
            default_token_lifetime: env_parse(
                "AAP_DEFAULT_TOKEN_LIFETIME",
                defaults.default_token_lifetime,
            ),
            delegated_lifetime_reduction: env_parse(
                "AAP_DELEGATED_LIFETIME_REDUCTION",
                defaults.delegated_lifetime_reduction,
            ),
            signing_algorithm: env_parse("AAP_SIGNING_ALGORITHM", defaults.signing_algorithm),
            private_key_path: env_path("AAP_PRIVATE_KEY_PATH", defaults.private_key_path),
            public_key_path: env_path("AAP_PUBLIC_KEY_PATH", defaults.public_key_path),
            key_id: env_string("AAP_KEY_ID", defaults.key_id),
            policy_path: env_path("AAP_POLICY_PATH", defaults.policy_path),
            default_max_delegation_depth: env_parse(
                "AAP_DEFAULT_MAX_DELEGATION_DEPTH",
                defaults.default_max_delegation_depth,
            ),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

pub(crate) fn env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            warn!(variable = key, value = %value, "Unparseable value; using default");
            default
        }),
        Err(_) => default,
    }
}
