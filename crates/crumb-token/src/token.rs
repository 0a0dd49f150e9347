//! Token serialization and verification.

use crate::claims::{Claims, RegisteredClaims, Session};
use crate::error::TokenError;
use crate::keys::KeyMaterial;
use crate::lifecycle::Lifecycle;
use crate::method::{BoundMethod, SigningMethod};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use crumb_core::SigningConfig;
use serde::Deserialize;

/// Encodes and decodes session claim sets. The object-safe seam the session
/// handler is built on.
pub trait SessionCodec: Send + Sync {
    /// Sign a session into a token string.
    fn encode(&self, session: &Session) -> Result<String, TokenError>;

    /// Verify a token and decode its session, judging temporal claims at `now`.
    fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenError>;

    /// A new session issued at `now`, carrying whatever issuer and audience
    /// this codec requires on decode.
    fn issue_at(&self, now: DateTime<Utc>) -> Session {
        Session::new_at(now)
    }
}

/// Signs and verifies tokens with exactly one method and key.
///
/// Immutable after construction and safe to share across threads.
#[derive(Debug)]
pub struct TokenSigner {
    bound: BoundMethod,
    leeway: Duration,
    issuer: Option<String>,
    audience: Vec<String>,
}

impl TokenSigner {
    /// Create a signer for `method` using `key`.
    pub fn new(method: SigningMethod, key: KeyMaterial) -> Result<Self, TokenError> {
        Ok(Self {
            bound: method.bind(&key)?,
            leeway: Duration::zero(),
            issuer: None,
            audience: Vec::new(),
        })
    }

    /// Build a signer from configuration, resolving key material.
    pub fn from_config(config: &SigningConfig) -> Result<Self, TokenError> {
        let method: SigningMethod = config.method.parse()?;
        let key = KeyMaterial::from_config(config, method)?;

        let leeway = i64::try_from(config.leeway_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or(TokenError::InvalidLeeway(config.leeway_secs))?;

        let mut signer = Self::new(method, key)?
            .with_leeway(leeway)
            .with_audience(config.audience.clone());
        if let Some(issuer) = &config.issuer {
            signer = signer.with_issuer(issuer.clone());
        }

        tracing::debug!(
            method = %method,
            can_sign = signer.can_sign(),
            "Token signer configured"
        );
        Ok(signer)
    }

    /// Tolerate clock skew on `exp` and `nbf`.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Require this `iss` claim.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Require the `aud` claim to contain one of these values.
    pub fn with_audience(mut self, audience: Vec<String>) -> Self {
        self.audience = audience;
        self
    }

    pub fn method(&self) -> SigningMethod {
        self.bound.method()
    }

    pub fn can_sign(&self) -> bool {
        self.bound.can_sign()
    }

    /// Sign `claims` into `header.payload.signature`.
    pub fn serialize<C: Claims>(&self, claims: &C) -> Result<String, TokenError> {
        claims.validate()?;
        self.bound.sign(claims)
    }

    /// Verify and decode a token, judging temporal claims against the system clock.
    pub fn unserialize<C: Claims>(&self, token: &str) -> Result<C, TokenError> {
        self.unserialize_at(token, Utc::now())
    }

    /// Verify and decode a token into `dest`. `dest` is untouched on error.
    pub fn unserialize_into<C: Claims>(
        &self,
        token: &str,
        dest: &mut C,
    ) -> Result<(), TokenError> {
        *dest = self.unserialize(token)?;
        Ok(())
    }

    /// Verify and decode a token, judging temporal claims at `now`.
    ///
    /// Checks run in order: structure (including a JSON object payload),
    /// algorithm, signature, issuer and audience, then expiry and not-before.
    pub fn unserialize_at<C: Claims>(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<C, TokenError> {
        let found = peek_alg(token)?;
        let expected = self.method();
        if found != expected.name() {
            tracing::warn!(
                expected = %expected,
                found = %found,
                "Rejected token with unexpected signing method"
            );
            return Err(TokenError::AlgorithmMismatch {
                expected: expected.name().to_string(),
                found,
            });
        }

        decode_payload(token)?;

        let claims: C = self
            .bound
            .verify(token)
            .inspect_err(|e| {
                if e.is_tamper() {
                    tracing::warn!(error = %e, "Rejected token");
                }
            })?;
        self.check_issuer_and_audience(claims.registered())?;

        let earliest = now.checked_sub_signed(self.leeway).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let latest = now.checked_add_signed(self.leeway).unwrap_or(DateTime::<Utc>::MAX_UTC);
        if claims.is_expired(earliest) {
            return Err(TokenError::Expired {
                // is_expired implies exp is set
                expired_at: claims.registered().expires_at.unwrap_or(now),
            });
        }
        if !claims.active(latest) {
            return Err(TokenError::NotYetActive {
                not_before: claims.registered().not_before.unwrap_or(now),
            });
        }

        Ok(claims)
    }

    /// A configured issuer or audience is required, not just matched when
    /// present.
    fn check_issuer_and_audience(&self, registered: &RegisteredClaims) -> Result<(), TokenError> {
        if let Some(expected) = &self.issuer {
            match registered.issuer.as_deref() {
                None => return Err(TokenError::InvalidClaims("missing required claim: iss".into())),
                Some(found) if found != expected => {
                    return Err(TokenError::InvalidClaims(format!(
                        "issuer {found:?} is not accepted"
                    )));
                }
                Some(_) => {}
            }
        }

        if !self.audience.is_empty() {
            if registered.audience.is_empty() {
                return Err(TokenError::InvalidClaims("missing required claim: aud".into()));
            }
            if !registered
                .audience
                .iter()
                .any(|aud| self.audience.iter().any(|accepted| accepted == aud))
            {
                return Err(TokenError::InvalidClaims("audience mismatch".into()));
            }
        }
        Ok(())
    }
}

impl SessionCodec for TokenSigner {
    fn encode(&self, session: &Session) -> Result<String, TokenError> {
        self.serialize(session)
    }

    fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session, TokenError> {
        self.unserialize_at(token, now)
    }

    fn issue_at(&self, now: DateTime<Utc>) -> Session {
        let mut session = Session::new_at(now);
        if let Some(issuer) = &self.issuer {
            session = session.with_issuer(issuer.clone());
        }
        if !self.audience.is_empty() {
            session = session.with_audience(self.audience.clone());
        }
        session
    }
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
}

/// Check the three-segment structure and read the header `alg` as a plain
/// string, so names the crypto library does not know (e.g. `none`) are still
/// reported as an algorithm mismatch rather than a parse failure.
fn peek_alg(token: &str) -> Result<String, TokenError> {
    Ok(decode_header(token)?.alg)
}

fn decode_header(token: &str) -> Result<RawHeader, TokenError> {
    let segments = token.split('.').count();
    if segments != 3 {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {segments}"
        )));
    }
    let header = token.split('.').next().unwrap_or_default();
    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| TokenError::Malformed(format!("header is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("header is not a JWT header: {e}")))
}

/// Decode the payload segment, which must be a base64url JSON object.
fn decode_payload(token: &str) -> Result<serde_json::Value, TokenError> {
    let payload = token.split('.').nth(1).unwrap_or_default();
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Malformed(format!("payload is not base64url: {e}")))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("payload is not JSON: {e}")))?;
    if !value.is_object() {
        return Err(TokenError::Malformed("payload is not a JSON object".into()));
    }
    Ok(value)
}

/// Information about a token, decoded without verification.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    /// Header `alg`.
    pub alg: String,
    /// Header `typ`.
    pub typ: Option<String>,
    /// Payload as JSON.
    pub claims: serde_json::Value,
}

/// Inspect a token without verification (for debugging).
pub fn inspect_unverified(token: &str) -> Result<TokenInfo, TokenError> {
    let header = decode_header(token)?;
    let claims = decode_payload(token)?;

    Ok(TokenInfo {
        alg: header.alg,
        typ: header.typ,
        claims,
    })
}
