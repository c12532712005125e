//! AAP Policy - operator policies and their evaluation
//!
//! This crate provides:
//! - The persisted policy document format
//! - A directory loader building the per-operator policy table
//! - Capability evaluation with monotone constraint tightening
//! - Per-delegation-step privilege reduction

pub mod document;
pub mod engine;
pub mod error;

pub use document::*;
pub use engine::*;
pub use error::*;
