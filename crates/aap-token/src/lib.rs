//! AAP Token - the signed contract between issuer and enforcer
//!
//! This crate provides:
//! - Signing key material (PEM-loaded ES256/RS256) and JWK export
//! - Token issuance for initial grants and delegated exchanges
//! - Resource-side token validation

pub mod error;
pub mod issuer;
pub mod keys;
pub mod validator;

pub use error::*;
pub use issuer::*;
pub use keys::*;
pub use validator::*;
