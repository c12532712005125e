//! Serve commands - start the authorization or resource server.

use tracing::info;

use aap_as::{AsConfig, AsServer};
use aap_rs::{RsConfig, RsServer};

pub async fn run_as() -> Result<(), Box<dyn std::error::Error>> {
    let config = AsConfig::from_env();
    let server = AsServer::new(config)?;

    server.run_with_shutdown(shutdown_signal()).await?;

    info!("Authorization server stopped");
    Ok(())
}

pub async fn run_rs() -> Result<(), Box<dyn std::error::Error>> {
    let config = RsConfig::from_env();
    let server = RsServer::new(config)?;

    server.run_with_shutdown(shutdown_signal()).await?;

    info!("Resource server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received");
}
