//! Client authentication seam.
//!
//! Production deployments plug a credential store in behind this trait; the
//! reference accepts any client presenting the fixed secret.

/// Authenticates OAuth clients at the token endpoint.
pub trait ClientAuthenticator: Send + Sync {
    fn authenticate(&self, client_id: &str, client_secret: &str) -> bool;
}

/// Reference authenticator: a single shared secret for every client.
pub struct StaticSecretAuthenticator {
    secret: String,
}

impl StaticSecretAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Default for StaticSecretAuthenticator {
    fn default() -> Self {
        Self::new("secret")
    }
}

impl ClientAuthenticator for StaticSecretAuthenticator {
    fn authenticate(&self, client_id: &str, client_secret: &str) -> bool {
        !client_id.is_empty() && client_secret == self.secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_secret_matches_only_the_configured_value() {
        let auth = StaticSecretAuthenticator::new("secret");
        assert!(auth.authenticate("client-1", "secret"));
        assert!(!auth.authenticate("client-1", "wrong"));
        assert!(!auth.authenticate("", "secret"));
    }
}
