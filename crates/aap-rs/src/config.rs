//! Resource server configuration.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

use aap_token::SigningAlgorithm;

/// Resource server settings, read once at startup.
#[derive(Debug, Clone)]
pub struct RsConfig {
    /// Expected `aud` value: this resource server's identifier.
    pub audience: String,
    /// Authorization servers whose tokens are accepted.
    pub trusted_issuers: Vec<String>,
    /// PEM file with the authorization server's public key.
    pub public_key_path: PathBuf,
    /// Key family of the verification key.
    pub signing_algorithm: SigningAlgorithm,
    /// `kid` the verification key is registered under.
    pub key_id: String,
    pub host: String,
    pub port: u16,
}

impl Default for RsConfig {
    fn default() -> Self {
        Self {
            audience: "https://api.example.com".to_string(),
            trusted_issuers: vec!["https://as.example.com".to_string()],
            public_key_path: PathBuf::from("keys/as_public_key.pem"),
            signing_algorithm: SigningAlgorithm::ES256,
            key_id: "aap-as-key-1".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

impl RsConfig {
    /// Read settings from `AAP_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            audience: env_string("AAP_RS_AUDIENCE", defaults.audience),
            trusted_issuers: match std::env::var("AAP_TRUSTED_ISSUERS") {
                Ok(value) => value
                    .split(',')
                    .map(str::trim)
                    .filter(|issuer| !issuer.is_empty())
                    .map(|issuer| issuer.to_string())
                    .collect(),
                Err(_) => defaults.trusted_issuers,
            },
            public_key_path: std::env::var("AAP_PUBLIC_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.public_key_path),
            signing_algorithm: env_parse("AAP_SIGNING_ALGORITHM", defaults.signing_algorithm),
            key_id: env_string("AAP_KEY_ID", defaults.key_id),
            host: env_string("AAP_RS_HOST", defaults.host),
            port: env_parse("AAP_RS_PORT", defaults.port),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T>(key: &str, default: T) -> T
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
