//! AAP Core - shared data model for the Agent Authorization Profile
//!
//! This crate provides:
//! - Capability records and the closed constraint model
//! - Token payload claims (agent, task, delegation, oversight, audit)
//! - The action-name grammar
//! - The wire error taxonomy shared by both services

pub mod capability;
pub mod claims;
pub mod context;
pub mod error;

pub use capability::*;
pub use claims::*;
pub use context::*;
pub use error::*;
