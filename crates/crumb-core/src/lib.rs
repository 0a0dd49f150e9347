//! # crumb-core
//!
//! Configuration types shared across the Crumb crates.
//!
//! A single `crumb.yaml` describes the session cookie, the signing method and
//! its key material, and the bind address of the demo server.

// Configuration types shared across all Crumb crates
pub mod config;

// Re-export commonly used config types for convenience
pub use config::{
    ConfigError, CookieConfig, CrumbConfig, MAX_AGE_LIMIT_SECS, MAX_LEEWAY_SECS, SameSitePolicy,
    ServerConfig, SigningConfig,
};
