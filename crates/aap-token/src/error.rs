//! Token issuance and key errors.

use std::path::PathBuf;

use thiserror::Error;

use aap_core::AapError;
use aap_policy::PolicyError;

/// Errors loading or exporting signing key material.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Failed to read key file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Errors from initial issuance and delegated exchange.
#[derive(Error, Debug)]
pub enum IssueError {
    #[error("No policy found for operator: {0}")]
    NoPolicy(String),

    #[error("No capabilities granted for requested actions: {0:?}")]
    NoCapabilitiesGranted(Vec<String>),

    #[error("Invalid parent token: {0}")]
    InvalidParent(String),

    #[error("Cannot delegate: depth {depth} >= max_depth {max_depth}")]
    DelegationDepthExceeded { depth: u32, max_depth: u32 },

    #[error("Requested capabilities not in parent token: {0:?}")]
    UnauthorizedSubset(Vec<String>),

    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

impl From<IssueError> for AapError {
    fn from(err: IssueError) -> Self {
        let description = err.to_string();
        match err {
            IssueError::NoPolicy(_)
            | IssueError::NoCapabilitiesGranted(_)
            | IssueError::Policy(_) => AapError::InvalidRequest(description),
            IssueError::InvalidParent(_)
            | IssueError::DelegationDepthExceeded { .. }
            | IssueError::UnauthorizedSubset(_) => AapError::InvalidGrant(description),
            IssueError::Signing(_) => {
                AapError::Internal("An internal error occurred".to_string())
            }
        }
    }
}
