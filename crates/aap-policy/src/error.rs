//! Policy errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from policy loading and evaluation.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("No policy found for operator: {0}")]
    NoPolicy(String),

    #[error("Policy document '{policy_id}' is missing applies_to.operator")]
    MissingOperator { policy_id: String },

    #[error("Policy document '{policy_id}' declares invalid action name '{action}'")]
    InvalidAction { policy_id: String, action: String },

    #[error("Failed to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse policy file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type PolicyResult<T> = Result<T, PolicyError>;
