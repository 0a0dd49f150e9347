//! Configuration types for Crumb.
//!
//! Configuration is loaded from a YAML file (`crumb.yaml`) into a single
//! `CrumbConfig`. Every section has defaults, so an empty file is a valid
//! configuration that signs with HS256 and reads the secret from
//! `CRUMB_SECRET`.
//!
//! # Sections
//!
//! - **cookie**: name, max-age and attributes of the session cookie
//! - **signing**: signing method, key material references and validation options
//! - **server**: bind address for `crumb serve`

pub mod cookie;
pub mod server;
pub mod signing;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use cookie::{CookieConfig, MAX_AGE_LIMIT_SECS, SameSitePolicy};
pub use server::ServerConfig;
pub use signing::{MAX_LEEWAY_SECS, SigningConfig};

/// Complete Crumb configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrumbConfig {
    /// Session cookie settings.
    #[serde(default)]
    pub cookie: CookieConfig,

    /// Token signing settings.
    #[serde(default)]
    pub signing: SigningConfig,

    /// Demo server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CrumbConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration and resolve file references relative to the config file.
    ///
    /// Relative `secret_file`, `private_key_file` and `public_key_file` paths are
    /// rewritten against the directory containing `path`.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let signing = &mut config.signing;
        for file in [
            &mut signing.secret_file,
            &mut signing.private_key_file,
            &mut signing.public_key_file,
        ] {
            if let Some(p) = file
                && p.is_relative()
            {
                *p = base_dir.join(&*p);
            }
        }

        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cookie.name.trim().is_empty() {
            return Err(ConfigError::Config("cookie.name must not be empty".into()));
        }
        if self.cookie.max_age_secs <= 0 {
            return Err(ConfigError::Config(format!(
                "cookie.max_age_secs must be positive, got {}",
                self.cookie.max_age_secs
            )));
        }
        if self.cookie.max_age_secs > MAX_AGE_LIMIT_SECS {
            return Err(ConfigError::Config(format!(
                "cookie.max_age_secs must be at most {MAX_AGE_LIMIT_SECS}, got {}",
                self.cookie.max_age_secs
            )));
        }
        if self.signing.leeway_secs > MAX_LEEWAY_SECS {
            return Err(ConfigError::Config(format!(
                "signing.leeway_secs must be at most {MAX_LEEWAY_SECS}, got {}",
                self.signing.leeway_secs
            )));
        }
        if self.cookie.same_site == SameSitePolicy::None && !self.cookie.secure {
            return Err(ConfigError::Config(
                "cookie.same_site 'none' requires cookie.secure".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CrumbConfig::from_yaml("{}").unwrap();
        assert_eq!(config.cookie.name, "crumb_session");
        assert_eq!(config.cookie.max_age_secs, 1800);
        assert_eq!(config.signing.method, "HS256");
        assert_eq!(config.signing.secret_env.as_deref(), Some("CRUMB_SECRET"));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
cookie:
  name: app_session
  max_age_secs: 600
  path: /app
  domain: example.com
  secure: true
  http_only: false
  same_site: Strict
signing:
  method: RS256
  private_key_file: keys/private.pem
  public_key_file: keys/public.pem
  leeway_secs: 5
  issuer: https://auth.example.com
  audience: [web]
server:
  host: 0.0.0.0
  port: 9000
"#;
        let config = CrumbConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.cookie.name, "app_session");
        assert_eq!(config.cookie.domain.as_deref(), Some("example.com"));
        assert!(!config.cookie.http_only);
        assert_eq!(config.cookie.same_site, SameSitePolicy::Strict);
        assert_eq!(config.signing.method, "RS256");
        assert_eq!(config.signing.leeway_secs, 5);
        assert_eq!(config.signing.audience, vec!["web".to_string()]);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_rejects_non_positive_max_age() {
        let err = CrumbConfig::from_yaml("cookie:\n  max_age_secs: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Config(_)));
    }

    #[test]
    fn test_rejects_out_of_range_durations() {
        let err = CrumbConfig::from_yaml("cookie:\n  max_age_secs: 9300000000000000\n").unwrap_err();
        assert!(matches!(err, ConfigError::Config(ref msg) if msg.contains("max_age_secs")));

        let err =
            CrumbConfig::from_yaml("signing:\n  leeway_secs: 18446744073709551615\n").unwrap_err();
        assert!(matches!(err, ConfigError::Config(ref msg) if msg.contains("leeway_secs")));

        let at_limit = format!("cookie:\n  max_age_secs: {MAX_AGE_LIMIT_SECS}\n");
        assert!(CrumbConfig::from_yaml(&at_limit).is_ok());
    }

    #[test]
    fn test_same_site_none_requires_secure() {
        let yaml = "cookie:\n  same_site: none\n  secure: false\n";
        assert!(CrumbConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_with_context_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("crumb.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "signing:\n  method: EdDSA\n  public_key_file: public.pem").unwrap();

        let config = CrumbConfig::load_with_context(&config_path).unwrap();
        assert_eq!(
            config.signing.public_key_file,
            Some(dir.path().join("public.pem"))
        );
        assert!(config.signing.private_key_file.is_none());
    }
}
