//! Session orchestration: cookie in, session out, and back again.
//!
//! [`SessionHandler`] ties a cookie transport, a token codec and a clock
//! together. It is immutable once built and is shared across requests.

use crate::clock::{Clock, SystemClock};
use crate::cookie::{CookieFactory, CookieTransport};
use crate::error::{ErrorKind, SessionError};
use chrono::Duration;
use crumb_core::{CrumbConfig, MAX_AGE_LIMIT_SECS};
use crumb_token::{Lifecycle, Session, SessionCodec, TokenSigner};
use http::HeaderMap;
use std::sync::Arc;

/// How long before "now" a deleted session's token expires.
const DELETED_SESSION_TTL_MINUTES: i64 = -30;

/// Where a request's session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No cookie; a new session was issued.
    Absent,
    /// The cookie was malformed, tampered with or signed with another method.
    Invalid,
    /// The cookie held a valid session.
    Live,
    /// The cookie held an expired or not-yet-active session; a new one was issued.
    Renewed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Absent => "absent",
            SessionState::Invalid => "invalid",
            SessionState::Live => "live",
            SessionState::Renewed => "renewed",
        }
    }
}

impl From<&SessionError> for SessionState {
    fn from(err: &SessionError) -> Self {
        match err.kind() {
            ErrorKind::Absent => SessionState::Absent,
            ErrorKind::TemporallyInvalid => SessionState::Renewed,
            _ => SessionState::Invalid,
        }
    }
}

/// Reads, writes and deletes the session cookie.
pub struct SessionHandler<T: CookieTransport = CookieFactory> {
    transport: T,
    codec: Arc<dyn SessionCodec>,
    clock: Arc<dyn Clock>,
}

impl<T: CookieTransport> std::fmt::Debug for SessionHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandler")
            .field("name", &self.name())
            .field("ttl_secs", &self.ttl().num_seconds())
            .finish()
    }
}

impl SessionHandler<CookieFactory> {
    /// Build a handler from a loaded configuration.
    pub fn from_config(config: &CrumbConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let signer = TokenSigner::from_config(&config.signing)?;

        tracing::info!(
            cookie = %config.cookie.name,
            ttl_secs = config.cookie.max_age_secs,
            method = %signer.method(),
            "Session handler ready"
        );
        Ok(Self::new(
            CookieFactory::new(config.cookie.clone()),
            Arc::new(signer),
        ))
    }
}

impl<T: CookieTransport> SessionHandler<T> {
    pub fn new(transport: T, codec: Arc<dyn SessionCodec>) -> Self {
        Self {
            transport,
            codec,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cookie name.
    pub fn name(&self) -> &str {
        &self.transport.config().name
    }

    /// Session TTL, equal to the cookie max-age. Clamped to the range
    /// configuration validation accepts, since a `CookieConfig` built in code
    /// skips it.
    pub fn ttl(&self) -> Duration {
        let secs = self.transport.config().max_age_secs.clamp(0, MAX_AGE_LIMIT_SECS);
        Duration::seconds(secs)
    }

    /// A fresh session issued now with the TTL applied.
    pub fn new_session(&self) -> Session {
        let now = self.clock.now();
        let mut session = self.codec.issue_at(now);
        session.extend_ttl(self.ttl(), now);
        session
    }

    /// Read the session from the request's cookie.
    ///
    /// A missing cookie is [`SessionError::Absent`]; any token error is
    /// returned as is, including expiry. With `check_only` the decoded session
    /// comes back untouched.
    ///
    /// Otherwise expiration slides: a session that verified but is past its
    /// expiry (possible within the signer's leeway) is swapped for a fresh one,
    /// and the TTL is re-applied from now. Callers that save the result on
    /// every response keep an active user signed in indefinitely.
    pub fn get_session(
        &self,
        headers: &HeaderMap,
        check_only: bool,
    ) -> Result<Session, SessionError> {
        let token = self
            .transport
            .get_cookie(headers, self.name())?
            .ok_or_else(|| SessionError::Absent {
                name: self.name().to_string(),
            })?;

        let now = self.clock.now();
        let mut session = self.codec.decode_at(&token, now)?;
        if check_only {
            return Ok(session);
        }

        if session.is_expired(now) {
            tracing::debug!(
                session_id = session.id().unwrap_or_default(),
                "Session expired within leeway, issuing a new one"
            );
            session = self.codec.issue_at(now);
        }
        session.extend_ttl(self.ttl(), now);
        Ok(session)
    }

    /// Read the session, issuing a fresh one when the cookie is missing,
    /// expired or not yet active.
    ///
    /// Malformed, tampered or wrongly signed cookies are returned as errors
    /// and never replaced.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<(Session, SessionState), SessionError> {
        match self.get_session(headers, false) {
            Ok(session) => Ok((session, SessionState::Live)),
            Err(err) if err.is_recoverable() => {
                let state = SessionState::from(&err);
                let session = self.new_session();
                tracing::debug!(
                    state = state.as_str(),
                    reason = %err,
                    session_id = session.id().unwrap_or_default(),
                    "Issued new session"
                );
                Ok((session, state))
            }
            Err(err) => {
                tracing::warn!(
                    cookie = self.name(),
                    kind = ?err.kind(),
                    error = %err,
                    "Rejected session cookie"
                );
                Err(err)
            }
        }
    }

    /// Sign `session` and append it to the response as a cookie.
    pub fn save_session(
        &self,
        headers: &mut HeaderMap,
        session: &Session,
    ) -> Result<(), SessionError> {
        let token = self.codec.encode(session)?;
        let cookie = self.transport.new_cookie(self.name(), token);
        self.transport.set_cookie(headers, &cookie)
    }

    /// Tell the client to drop its session cookie.
    ///
    /// The cookie still carries a signed token, one that expired thirty
    /// minutes ago, so a client that ignores the expiry gets a temporally
    /// invalid session rather than its old one.
    pub fn delete_session(&self, headers: &mut HeaderMap) -> Result<(), SessionError> {
        let now = self.clock.now();
        let mut session = self.codec.issue_at(now);
        session.extend_ttl(Duration::minutes(DELETED_SESSION_TTL_MINUTES), now);

        let token = self.codec.encode(&session)?;
        let cookie = self
            .transport
            .expire_cookie(self.transport.new_cookie(self.name(), token));
        self.transport.set_cookie(headers, &cookie)?;

        tracing::debug!(cookie = self.name(), "Session cookie cleared");
        Ok(())
    }
}
