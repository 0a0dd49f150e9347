//! Session lifecycle: freshness, expiry, validity and TTL extension.
//!
//! Every check takes the current time from the caller instead of reading the
//! system clock, so the same claim set can be evaluated at any instant.

use crate::claims::{Claims, RegisteredClaims, Session};
use chrono::{DateTime, Duration, Utc};
use serde_json::Map;
use uuid::Uuid;

/// Temporal operations available on every claim set.
pub trait Lifecycle: Claims {
    /// True iff `not_before` is before `now`. A claim set without `nbf` is active.
    fn active(&self, now: DateTime<Utc>) -> bool {
        self.registered().not_before.is_none_or(|nbf| nbf < now)
    }

    /// True iff `expires_at` is before `now`. A claim set without `exp` never expires.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.registered().expires_at.is_some_and(|exp| exp < now)
    }

    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.active(now) && !self.is_expired(now)
    }

    /// Set `expires_at = now + ttl`, truncated to whole seconds.
    ///
    /// A negative `ttl` places the expiry in the past, which is how a session
    /// is invalidated. Saturates at the bounds of the calendar.
    fn extend_ttl(&mut self, ttl: Duration, now: DateTime<Utc>) {
        let expires_at = now.checked_add_signed(ttl).unwrap_or(if ttl < Duration::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
        self.registered_mut().expires_at = Some(truncate_to_seconds(expires_at));
    }

    /// Time left before expiry, negative once expired. `None` without `exp`.
    fn time_until_expiry(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.registered().expires_at.map(|exp| exp - now)
    }
}

impl<T: Claims> Lifecycle for T {}

impl Session {
    /// A fresh session with a unique id issued now. Expiry is left unset until
    /// the caller applies a TTL.
    pub fn new() -> Self {
        Self::new_at(Utc::now())
    }

    /// A fresh session issued at `now`.
    pub fn new_at(now: DateTime<Utc>) -> Self {
        Session {
            registered: RegisteredClaims {
                id: Some(Uuid::new_v4().to_string()),
                issued_at: Some(truncate_to_seconds(now)),
                ..RegisteredClaims::default()
            },
            extra: Map::new(),
        }
    }
}

/// Drop sub-second precision; the wire format carries whole seconds.
pub fn truncate_to_seconds(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(t.timestamp(), 0).unwrap_or(t)
}
