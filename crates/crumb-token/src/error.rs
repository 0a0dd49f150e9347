//! Error types for the token crate.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while signing or verifying session tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token is not three base64url segments with a JSON header and payload.
    #[error("invalid jwt; malformed: {0}")]
    Malformed(String),

    /// The token header names a different algorithm than the verifier uses.
    #[error("unexpected signing method: expected {expected}, token uses {found}")]
    AlgorithmMismatch { expected: String, found: String },

    /// Signature does not match (tampered token or wrong key).
    #[error("invalid jwt; signature is invalid")]
    InvalidSignature,

    /// The token expired.
    #[error("invalid jwt; expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    /// The token is not active yet.
    #[error("invalid jwt; inactive until {not_before}")]
    NotYetActive { not_before: DateTime<Utc> },

    /// Registered claims are inconsistent or do not match expectations.
    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    /// Unknown method identifier.
    #[error("unsupported signing method: {0}")]
    UnsupportedSigningMethod(String),

    /// Key material is unusable for the configured method.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Configured clock-skew leeway does not fit a duration.
    #[error("leeway of {0} seconds is out of range")]
    InvalidLeeway(u64),

    /// The signer was built for verification only.
    #[error("no private key configured; this signer can only verify")]
    MissingSigningKey,

    /// Signing failed inside the crypto library.
    #[error("failed to sign token: {0}")]
    Signing(String),

    /// IO error (reading key files).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Classification of a [`TokenError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenErrorKind {
    Malformed,
    AlgorithmMismatch,
    SignatureInvalid,
    /// Expired or not yet active. Recoverable by issuing a new session.
    TemporallyInvalid,
    InvalidClaims,
    /// Signer misconfiguration: method, key material or IO.
    Configuration,
}

impl TokenError {
    pub fn kind(&self) -> TokenErrorKind {
        match self {
            TokenError::Malformed(_) => TokenErrorKind::Malformed,
            TokenError::AlgorithmMismatch { .. } => TokenErrorKind::AlgorithmMismatch,
            TokenError::InvalidSignature => TokenErrorKind::SignatureInvalid,
            TokenError::Expired { .. } | TokenError::NotYetActive { .. } => {
                TokenErrorKind::TemporallyInvalid
            }
            TokenError::InvalidClaims(_) => TokenErrorKind::InvalidClaims,
            TokenError::UnsupportedSigningMethod(_)
            | TokenError::InvalidKey(_)
            | TokenError::InvalidLeeway(_)
            | TokenError::MissingSigningKey
            | TokenError::Signing(_)
            | TokenError::IoError(_) => TokenErrorKind::Configuration,
        }
    }

    /// True for expired and not-yet-active tokens.
    pub fn is_temporal(&self) -> bool {
        self.kind() == TokenErrorKind::TemporallyInvalid
    }

    /// True when the token may have been tampered with or forged.
    pub fn is_tamper(&self) -> bool {
        matches!(
            self.kind(),
            TokenErrorKind::Malformed
                | TokenErrorKind::AlgorithmMismatch
                | TokenErrorKind::SignatureInvalid
        )
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => TokenError::Malformed(err.to_string()),
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            // The header alg is compared before decoding, so this is a key family mismatch.
            ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
                TokenError::InvalidKey("key does not match the signing algorithm".into())
            }
            ErrorKind::InvalidIssuer => TokenError::InvalidClaims("issuer mismatch".into()),
            ErrorKind::InvalidAudience => TokenError::InvalidClaims("audience mismatch".into()),
            ErrorKind::MissingRequiredClaim(claim) => {
                TokenError::InvalidClaims(format!("missing required claim: {claim}"))
            }
            ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidKeyFormat => TokenError::InvalidKey(err.to_string()),
            _ => TokenError::Signing(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            TokenError::Malformed("x".into()).kind(),
            TokenErrorKind::Malformed
        );
        assert!(TokenError::InvalidSignature.is_tamper());
        assert!(
            TokenError::Expired {
                expired_at: Utc::now()
            }
            .is_temporal()
        );
        assert!(
            TokenError::NotYetActive {
                not_before: Utc::now()
            }
            .is_temporal()
        );
        assert!(!TokenError::MissingSigningKey.is_tamper());
        assert_eq!(
            TokenError::MissingSigningKey.kind(),
            TokenErrorKind::Configuration
        );
        assert_eq!(
            TokenError::InvalidLeeway(u64::MAX).kind(),
            TokenErrorKind::Configuration
        );
    }
}
