//! CLI command implementations for Crumb.

pub mod keys;
pub mod serve;
pub mod token;
