//! AAP Authorization Server - HTTP adapter over the issuance core
//!
//! The server exposes:
//! - `POST /token` for the client-credentials and token-exchange grants
//! - OAuth 2.0 authorization server metadata (RFC 8414)
//! - The JWKS document for resource-server verification

pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use clients::*;
pub use config::*;
pub use error::*;
pub use server::*;
pub use state::*;
