//! Token signing configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest accepted clock-skew leeway: one day.
pub const MAX_LEEWAY_SECS: u64 = 24 * 60 * 60;

/// Configuration for signing and verifying session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Signing method identifier (e.g., "HS256", "ES256", "EdDSA", "PS512").
    #[serde(default = "default_method")]
    pub method: String,

    /// Environment variable containing the HMAC secret.
    #[serde(default = "default_secret_env")]
    pub secret_env: Option<String>,

    /// Path to a file containing the HMAC secret.
    #[serde(default)]
    pub secret_file: Option<PathBuf>,

    /// Path to the PEM-encoded private key (asymmetric methods).
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,

    /// Path to the PEM-encoded public key (asymmetric methods).
    #[serde(default)]
    pub public_key_file: Option<PathBuf>,

    /// Clock skew tolerance in seconds for `exp` and `nbf`.
    #[serde(default)]
    pub leeway_secs: u64,

    /// Expected `iss` claim. Not checked when unset.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Accepted `aud` values. Not checked when empty.
    #[serde(default)]
    pub audience: Vec<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            secret_env: default_secret_env(),
            secret_file: None,
            private_key_file: None,
            public_key_file: None,
            leeway_secs: 0,
            issuer: None,
            audience: Vec::new(),
        }
    }
}

impl SigningConfig {
    /// Resolve the HMAC secret from environment or file.
    pub fn resolve_secret(&self) -> Result<Option<Vec<u8>>, std::io::Error> {
        // Try environment variable first
        if let Some(env_var) = &self.secret_env
            && let Ok(secret) = std::env::var(env_var)
            && !secret.is_empty()
        {
            return Ok(Some(secret.into_bytes()));
        }

        // Try file path
        if let Some(path) = &self.secret_file {
            let secret = std::fs::read_to_string(path)?;
            return Ok(Some(secret.trim().as_bytes().to_vec()));
        }

        Ok(None)
    }

    /// Read the PEM-encoded private key, if configured.
    pub fn resolve_private_key_pem(&self) -> Result<Option<Vec<u8>>, std::io::Error> {
        self.private_key_file.as_ref().map(std::fs::read).transpose()
    }

    /// Read the PEM-encoded public key, if configured.
    pub fn resolve_public_key_pem(&self) -> Result<Option<Vec<u8>>, std::io::Error> {
        self.public_key_file.as_ref().map(std::fs::read).transpose()
    }
}

fn default_method() -> String {
    "HS256".to_string()
}

fn default_secret_env() -> Option<String> {
    Some("CRUMB_SECRET".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_secret_from_env_wins_over_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "from-file").unwrap();

        // SAFETY: We're in a test and controlling the environment
        unsafe {
            std::env::set_var("CRUMB_TEST_SECRET_ENV_WINS", "from-env");
        }

        let config = SigningConfig {
            secret_env: Some("CRUMB_TEST_SECRET_ENV_WINS".into()),
            secret_file: Some(file.path().to_path_buf()),
            ..SigningConfig::default()
        };
        assert_eq!(config.resolve_secret().unwrap(), Some(b"from-env".to_vec()));

        // SAFETY: Cleanup in test
        unsafe {
            std::env::remove_var("CRUMB_TEST_SECRET_ENV_WINS");
        }
    }

    #[test]
    fn test_secret_from_file_is_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  s3cret  ").unwrap();

        let config = SigningConfig {
            secret_env: Some("CRUMB_TEST_SECRET_UNSET".into()),
            secret_file: Some(file.path().to_path_buf()),
            ..SigningConfig::default()
        };
        assert_eq!(config.resolve_secret().unwrap(), Some(b"s3cret".to_vec()));
    }

    #[test]
    fn test_missing_secret_resolves_to_none() {
        let config = SigningConfig {
            secret_env: None,
            ..SigningConfig::default()
        };
        assert_eq!(config.resolve_secret().unwrap(), None);
    }

    #[test]
    fn test_missing_key_file_is_an_error() {
        let config = SigningConfig {
            public_key_file: Some(PathBuf::from("/nonexistent/crumb/public.pem")),
            ..SigningConfig::default()
        };
        assert!(config.resolve_public_key_pem().is_err());
        assert_eq!(config.resolve_private_key_pem().unwrap(), None);
    }
}
