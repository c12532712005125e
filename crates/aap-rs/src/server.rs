//! Resource server entry point.

use axum::middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::RsConfig;
use crate::middleware::{cors_layer, logging};
use crate::routes::create_router;
use crate::state::AppState;

/// The AAP Resource Server.
pub struct RsServer {
    state: Arc<AppState>,
}

impl RsServer {
    /// Build the server, loading the verification key from disk.
    pub fn new(config: RsConfig) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            state: Arc::new(AppState::new(config)?),
        })
    }

    /// Build the server around pre-assembled state.
    pub fn from_state(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Router with the full middleware stack.
    pub fn router(&self) -> axum::Router {
        create_router(Arc::clone(&self.state))
            .layer(middleware::from_fn(logging))
            .layer(cors_layer())
    }

    /// Serve until the shutdown future resolves.
    pub async fn run_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.state.config.bind_address();
        info!(
            address = %addr,
            audience = %self.state.config.audience,
            "Starting AAP Resource Server"
        );

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| {
                error!(error = %e, "Server error");
                Box::new(e) as Box<dyn std::error::Error>
            })
    }

    /// Serve until the process is stopped.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.state.config.bind_address();
        info!(
            address = %addr,
            audience = %self.state.config.audience,
            "Starting AAP Resource Server"
        );

        let listener = TcpListener::bind(&addr).await?;
        axum::serve(listener, self.router()).await.map_err(|e| {
            error!(error = %e, "Server error");
            Box::new(e) as Box<dyn std::error::Error>
        })
    }
}
