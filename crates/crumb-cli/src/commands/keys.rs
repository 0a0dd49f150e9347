//! Key management commands.
//!
//! `crumb keys generate` - Generate a random HMAC secret.

use crumb_token::generate_secret;
use std::fs;
use std::path::PathBuf;

/// Generate a new HMAC secret of `length` random bytes.
pub fn generate(output: Option<PathBuf>, length: usize) -> anyhow::Result<()> {
    anyhow::ensure!(length > 0, "--length must be at least 1 byte");
    let secret = generate_secret(length);

    if let Some(output_dir) = output {
        fs::create_dir_all(&output_dir)?;

        let secret_path = output_dir.join("secret.key");
        fs::write(&secret_path, &secret)?;

        println!("✔ Generated {length}-byte HMAC secret:");
        println!("  Secret: {}", secret_path.display());
        println!();
        println!("⚠️  Keep your secret safe! Never commit it to version control.");
        println!();
        println!("Reference it from crumb.yaml:");
        println!("  signing:");
        println!("    secret_file: {}", secret_path.display());
        println!();
        println!("Or set it as an environment variable:");
        println!("  export CRUMB_SECRET=$(cat {})", secret_path.display());
    } else {
        println!("{secret}");
    }

    Ok(())
}
