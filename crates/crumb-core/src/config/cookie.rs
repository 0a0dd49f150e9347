//! Session cookie configuration.
//!
//! This module defines the name, lifetime and attributes of the cookie that
//! carries the signed session token.

use serde::{Deserialize, Serialize};

/// Longest accepted max-age. Browsers cap cookie lifetime at 400 days.
pub const MAX_AGE_LIMIT_SECS: i64 = 400 * 24 * 60 * 60;

/// Configuration for the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Cookie name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Cookie max-age in seconds. Also the session TTL applied to claim sets.
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: i64,

    /// Cookie path.
    #[serde(default = "default_path")]
    pub path: String,

    /// Cookie domain. Host-only when unset.
    #[serde(default)]
    pub domain: Option<String>,

    /// Send only over HTTPS. A non-secure cookie will not overwrite a secure one.
    #[serde(default = "default_true")]
    pub secure: bool,

    /// Hide the cookie from client-side scripts.
    #[serde(default = "default_true")]
    pub http_only: bool,

    /// SameSite policy.
    #[serde(default)]
    pub same_site: SameSitePolicy,
}

/// SameSite attribute policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
    /// No SameSite attribute is sent; the browser default applies.
    Default,
}

impl SameSitePolicy {
    /// Parse a policy name case-insensitively. Unknown names map to `Default`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "strict" => Self::Strict,
            "lax" => Self::Lax,
            "none" => Self::None,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::None => "none",
            Self::Default => "default",
        }
    }
}

impl From<String> for SameSitePolicy {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<SameSitePolicy> for String {
    fn from(policy: SameSitePolicy) -> Self {
        policy.as_str().to_string()
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_age_secs: default_max_age_secs(),
            path: default_path(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: SameSitePolicy::default(),
        }
    }
}

impl CookieConfig {
    /// A secure, HTTP-only cookie for the whole site that lives for 30 minutes.
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

fn default_name() -> String {
    "crumb_session".to_string()
}

fn default_max_age_secs() -> i64 {
    60 * 30
}

fn default_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_site_parse() {
        assert_eq!(SameSitePolicy::parse("Strict"), SameSitePolicy::Strict);
        assert_eq!(SameSitePolicy::parse("LAX"), SameSitePolicy::Lax);
        assert_eq!(SameSitePolicy::parse("none"), SameSitePolicy::None);
        assert_eq!(SameSitePolicy::parse("sometimes"), SameSitePolicy::Default);
        assert_eq!(SameSitePolicy::parse(""), SameSitePolicy::Default);
    }

    #[test]
    fn test_simple_cookie() {
        let config = CookieConfig::simple("sid");
        assert_eq!(config.name, "sid");
        assert_eq!(config.max_age_secs, 1800);
        assert_eq!(config.path, "/");
        assert!(config.secure);
        assert!(config.http_only);
    }
}
