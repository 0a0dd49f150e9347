//! Error types for the session crate.

use crumb_core::ConfigError;
use crumb_token::{TokenError, TokenErrorKind};
use thiserror::Error;

/// Errors that can occur while reading, writing or deleting a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The request carries no session cookie.
    #[error("no session cookie named '{name}'")]
    Absent { name: String },

    /// The cookie value failed token verification or signing failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Cookie headers could not be read or written.
    #[error("cookie transport failed: {0}")]
    Transport(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Absent,
    Malformed,
    AlgorithmMismatch,
    SignatureInvalid,
    TemporallyInvalid,
    InvalidClaims,
    TransportFailure,
    Configuration,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Absent { .. } => ErrorKind::Absent,
            SessionError::Token(err) => match err.kind() {
                TokenErrorKind::Malformed => ErrorKind::Malformed,
                TokenErrorKind::AlgorithmMismatch => ErrorKind::AlgorithmMismatch,
                TokenErrorKind::SignatureInvalid => ErrorKind::SignatureInvalid,
                TokenErrorKind::TemporallyInvalid => ErrorKind::TemporallyInvalid,
                TokenErrorKind::InvalidClaims => ErrorKind::InvalidClaims,
                TokenErrorKind::Configuration => ErrorKind::Configuration,
            },
            SessionError::Transport(_) => ErrorKind::TransportFailure,
            SessionError::Config(_) => ErrorKind::Configuration,
        }
    }

    /// Whether issuing a fresh session is an acceptable answer to this error.
    ///
    /// Only a missing cookie or an expired/not-yet-active token qualify.
    /// Tampering, algorithm mismatches and malformed tokens never do.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Absent | ErrorKind::TemporallyInvalid)
    }
}
