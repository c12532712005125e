//! AAP CLI - key generation and service entry points.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "aap")]
#[command(version, about = "Agent Authorization Profile reference services", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an ES256 signing key pair in PEM format
    Keygen {
        /// Output path for the private key
        #[arg(long, default_value = "keys/as_private_key.pem", env = "AAP_PRIVATE_KEY_PATH")]
        private_key: PathBuf,

        /// Output path for the public key
        #[arg(long, default_value = "keys/as_public_key.pem", env = "AAP_PUBLIC_KEY_PATH")]
        public_key: PathBuf,
    },

    /// Run one of the AAP services
    Serve {
        #[command(subcommand)]
        service: ServeCommands,
    },
}

#[derive(Subcommand)]
enum ServeCommands {
    /// Authorization server: token issuance and exchange
    As,
    /// Resource server: token validation and constraint enforcement
    Rs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Keygen {
            private_key,
            public_key,
        } => {
            commands::keygen::run(&private_key, &public_key)?;
        }
        Commands::Serve { service } => match service {
            ServeCommands::As => commands::serve::run_as().await?,
            ServeCommands::Rs => commands::serve::run_rs().await?,
        },
    }

    Ok(())
}
