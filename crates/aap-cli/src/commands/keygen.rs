//! Keygen command - generate the authorization server signing key pair.

use std::path::Path;

use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use tracing::info;

pub fn run(private_key_path: &Path, public_key_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);
    let private_pem = secret.to_pkcs8_pem(LineEnding::LF)?;
    let public_pem = secret.public_key().to_public_key_pem(LineEnding::LF)?;

    if let Some(parent) = private_key_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if let Some(parent) = public_key_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(private_key_path, private_pem.as_bytes())?;
    std::fs::write(public_key_path, public_pem.as_bytes())?;

    info!(
        private_key = %private_key_path.display(),
        public_key = %public_key_path.display(),
        "Generated ES256 key pair"
    );

    println!("Generated ES256 key pair:");
    println!("  Private key: {}", private_key_path.display());
    println!("  Public key:  {}", public_key_path.display());
    println!();
    println!("Point AAP_PRIVATE_KEY_PATH / AAP_PUBLIC_KEY_PATH at these files.");

    Ok(())
}
