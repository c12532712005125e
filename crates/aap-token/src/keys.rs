//! Signing key material.
//!
//! The authorization server holds one active signing key, loaded from PEM
//! files. The public half is exported through JWKS so resource servers can
//! fetch verification material.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    ES256,
    RS256,
}

impl SigningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ES256 => "ES256",
            Self::RS256 => "RS256",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ES256" => Ok(Self::ES256),
            "RS256" => Ok(Self::RS256),
            other => Err(KeyError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl From<SigningAlgorithm> for Algorithm {
    fn from(algorithm: SigningAlgorithm) -> Self {
        match algorithm {
            SigningAlgorithm::ES256 => Algorithm::ES256,
            SigningAlgorithm::RS256 => Algorithm::RS256,
        }
    }
}

/// The active signing key pair with its `kid`.
pub struct SigningKey {
    kid: String,
    algorithm: SigningAlgorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    public_pem: String,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .field("public_pem", &self.public_pem)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Load the pair from PEM files on disk.
    pub fn from_pem_files(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        private_key_path: &Path,
        public_key_path: &Path,
    ) -> Result<Self, KeyError> {
        let private_pem =
            std::fs::read_to_string(private_key_path).map_err(|source| KeyError::Io {
                path: private_key_path.to_path_buf(),
                source,
            })?;
        let public_pem =
            std::fs::read_to_string(public_key_path).map_err(|source| KeyError::Io {
                path: public_key_path.to_path_buf(),
                source,
            })?;
        Self::from_pem(kid, algorithm, &private_pem, &public_pem)
    }

    /// Build the pair from in-memory PEM documents.
    pub fn from_pem(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, KeyError> {
        let (encoding, decoding) = match algorithm {
            SigningAlgorithm::ES256 => (
                EncodingKey::from_ec_pem(private_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))?,
                DecodingKey::from_ec_pem(public_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))?,
            ),
            SigningAlgorithm::RS256 => (
                EncodingKey::from_rsa_pem(private_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))?,
                DecodingKey::from_rsa_pem(public_pem.as_bytes())
                    .map_err(|e| KeyError::InvalidKey(e.to_string()))?,
            ),
        };

        Ok(Self {
            kid: kid.into(),
            algorithm,
            encoding,
            decoding,
            public_pem: public_pem.to_string(),
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    pub fn public_key_pem(&self) -> &str {
        &self.public_pem
    }

    /// Export the public half as a JWK.
    pub fn to_jwk(&self) -> Result<Jwk, KeyError> {
        match self.algorithm {
            SigningAlgorithm::ES256 => self.ec_jwk(),
            SigningAlgorithm::RS256 => self.rsa_jwk(),
        }
    }

    fn ec_jwk(&self) -> Result<Jwk, KeyError> {
        use p256::elliptic_curve::sec1::ToEncodedPoint;
        use p256::pkcs8::DecodePublicKey;

        let public = p256::PublicKey::from_public_key_pem(&self.public_pem)
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;
        let point = public.to_encoded_point(false);
        let x = point
            .x()
            .ok_or_else(|| KeyError::InvalidKey("EC point missing x coordinate".to_string()))?;
        let y = point
            .y()
            .ok_or_else(|| KeyError::InvalidKey("EC point missing y coordinate".to_string()))?;

        Ok(Jwk {
            kty: "EC".to_string(),
            crv: Some("P-256".to_string()),
            x: Some(URL_SAFE_NO_PAD.encode(x)),
            y: Some(URL_SAFE_NO_PAD.encode(y)),
            n: None,
            e: None,
            key_use: "sig".to_string(),
            alg: self.algorithm.as_str().to_string(),
            kid: self.kid.clone(),
        })
    }

    fn rsa_jwk(&self) -> Result<Jwk, KeyError> {
        use rsa::pkcs1::DecodeRsaPublicKey;
        use rsa::pkcs8::DecodePublicKey;
        use rsa::traits::PublicKeyParts;

        let public = rsa::RsaPublicKey::from_public_key_pem(&self.public_pem)
            .or_else(|_| rsa::RsaPublicKey::from_pkcs1_pem(&self.public_pem))
            .map_err(|e| KeyError::InvalidKey(e.to_string()))?;

        Ok(Jwk {
            kty: "RSA".to_string(),
            crv: None,
            x: None,
            y: None,
            n: Some(URL_SAFE_NO_PAD.encode(public.n().to_bytes_be())),
            e: Some(URL_SAFE_NO_PAD.encode(public.e().to_bytes_be())),
            key_use: "sig".to_string(),
            alg: self.algorithm.as_str().to_string(),
            kid: self.kid.clone(),
        })
    }
}

/// Build a verification key from a public-key PEM document.
///
/// Used by resource servers that hold only the issuer's public half.
pub fn decoding_key_from_pem(
    algorithm: SigningAlgorithm,
    public_pem: &str,
) -> Result<DecodingKey, KeyError> {
    match algorithm {
        SigningAlgorithm::ES256 => DecodingKey::from_ec_pem(public_pem.as_bytes()),
        SigningAlgorithm::RS256 => DecodingKey::from_rsa_pem(public_pem.as_bytes()),
    }
    .map_err(|e| KeyError::InvalidKey(e.to_string()))
}

/// A public verification key in JWK form.
#[derive(Debug, Clone, Serialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(rename = "use")]
    pub key_use: String,
    pub alg: String,
    pub kid: String,
}

/// JWKS document served at `/.well-known/jwks.json`.
#[derive(Debug, Clone, Serialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};

    fn generate_es256_pems() -> (String, String) {
        let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);
        let private_pem = secret.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        let public_pem = secret.public_key().to_public_key_pem(LineEnding::LF).unwrap();
        (private_pem, public_pem)
    }

    #[test]
    fn algorithm_parses_from_config_strings() {
        assert_eq!(
            "ES256".parse::<SigningAlgorithm>().unwrap(),
            SigningAlgorithm::ES256
        );
        assert_eq!(
            "RS256".parse::<SigningAlgorithm>().unwrap(),
            SigningAlgorithm::RS256
        );
        assert!("HS256".parse::<SigningAlgorithm>().is_err());
    }

    #[test]
    fn es256_key_loads_and_exports_a_jwk() {
        let (private_pem, public_pem) = generate_es256_pems();
        let key = SigningKey::from_pem(
            "aap-as-key-1",
            SigningAlgorithm::ES256,
            &private_pem,
            &public_pem,
        )
        .unwrap();

        let jwk = key.to_jwk().unwrap();
        assert_eq!(jwk.kty, "EC");
        assert_eq!(jwk.crv.as_deref(), Some("P-256"));
        assert_eq!(jwk.alg, "ES256");
        assert_eq!(jwk.kid, "aap-as-key-1");
        assert_eq!(jwk.key_use, "sig");
        // P-256 coordinates are 32 bytes -> 43 base64url chars unpadded.
        assert_eq!(jwk.x.as_ref().unwrap().len(), 43);
        assert_eq!(jwk.y.as_ref().unwrap().len(), 43);
        assert!(jwk.n.is_none());

        let json = serde_json::to_value(&jwk).unwrap();
        assert_eq!(json.get("use"), Some(&serde_json::json!("sig")));
    }

    #[test]
    fn garbage_pem_is_rejected() {
        let err = SigningKey::from_pem(
            "k",
            SigningAlgorithm::ES256,
            "not a key",
            "also not a key",
        )
        .unwrap_err();
        assert!(matches!(err, KeyError::InvalidKey(_)));
    }
}
