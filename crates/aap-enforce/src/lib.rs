//! AAP Enforce - resource-side capability checks
//!
//! This crate provides:
//! - Capability matching against requested actions
//! - Runtime constraint enforcement (rate, domain, time, method, size)
//! - The human-approval oversight gate

pub mod enforcer;
pub mod matcher;
pub mod oversight;

pub use enforcer::*;
pub use matcher::*;
pub use oversight::*;
