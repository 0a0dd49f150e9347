//! Registered JWT claims and the session claim set.

use crate::error::TokenError;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Wire names of the registered claims. Extension claims may not reuse them.
pub const REGISTERED_CLAIM_NAMES: [&str; 7] = ["iss", "sub", "aud", "exp", "nbf", "iat", "jti"];

/// Anything that can be signed into a token and parsed back out of one.
///
/// Implementors expose their registered claims so temporal and identity
/// checks can run over any claim layout. A custom claim struct usually
/// flattens a [`RegisteredClaims`]:
///
/// ```
/// use crumb_token::{Claims, RegisteredClaims};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct UserClaims {
///     #[serde(flatten)]
///     registered: RegisteredClaims,
///     #[serde(rename = "eml")]
///     email: String,
/// }
///
/// impl Claims for UserClaims {
///     fn registered(&self) -> &RegisteredClaims {
///         &self.registered
///     }
///     fn registered_mut(&mut self) -> &mut RegisteredClaims {
///         &mut self.registered
///     }
/// }
/// ```
pub trait Claims: Serialize + DeserializeOwned + Clone {
    fn registered(&self) -> &RegisteredClaims;

    fn registered_mut(&mut self) -> &mut RegisteredClaims;

    /// Check invariants that must hold before the claims are signed.
    fn validate(&self) -> Result<(), TokenError> {
        self.registered().validate()
    }
}

/// The registered claims of RFC 7519, all optional and omitted when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    /// Issuer (`iss`).
    #[serde(rename = "iss", default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Subject (`sub`).
    #[serde(rename = "sub", default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Audience (`aud`).
    #[serde(rename = "aud", default, skip_serializing_if = "Audience::is_empty")]
    pub audience: Audience,

    /// Expiry (`exp`).
    #[serde(
        rename = "exp",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub expires_at: Option<DateTime<Utc>>,

    /// Not valid before (`nbf`).
    #[serde(
        rename = "nbf",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub not_before: Option<DateTime<Utc>>,

    /// Issued at (`iat`).
    #[serde(
        rename = "iat",
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub issued_at: Option<DateTime<Utc>>,

    /// Unique token identifier (`jti`).
    #[serde(rename = "jti", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl RegisteredClaims {
    /// The validity window must not be inverted.
    pub fn validate(&self) -> Result<(), TokenError> {
        if let (Some(nbf), Some(exp)) = (self.not_before, self.expires_at)
            && nbf > exp
        {
            return Err(TokenError::InvalidClaims(format!(
                "not-before {nbf} is after expiry {exp}"
            )));
        }
        Ok(())
    }
}

impl Claims for RegisteredClaims {
    fn registered(&self) -> &RegisteredClaims {
        self
    }

    fn registered_mut(&mut self) -> &mut RegisteredClaims {
        self
    }
}

/// The `aud` claim: a single string on the wire when it has one value,
/// an array otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience(Vec<String>);

impl Audience {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|a| a == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<Vec<String>> for Audience {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl Serialize for Audience {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(value) => Self(vec![value]),
            OneOrMany::Many(values) => Self(values),
        })
    }
}

/// A session claim set: registered claims plus caller-defined extension claims
/// (role ids, permission lists, locale, flags).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(flatten)]
    pub registered: RegisteredClaims,

    /// Application-specific claims, keyed by wire name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.registered.subject = Some(subject.into());
        self
    }

    /// Set the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.registered.issuer = Some(issuer.into());
        self
    }

    /// Set the audience.
    pub fn with_audience(mut self, audience: impl Into<Audience>) -> Self {
        self.registered.audience = audience.into();
        self
    }

    /// Set the earliest time the session is valid from.
    pub fn with_not_before(mut self, not_before: DateTime<Utc>) -> Self {
        self.registered.not_before = Some(not_before);
        self
    }

    /// Insert an extension claim.
    pub fn insert<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), TokenError> {
        if REGISTERED_CLAIM_NAMES.contains(&key) {
            return Err(TokenError::InvalidClaims(format!(
                "'{key}' is a registered claim"
            )));
        }
        let value =
            serde_json::to_value(value).map_err(|e| TokenError::InvalidClaims(e.to_string()))?;
        self.extra.insert(key.to_string(), value);
        Ok(())
    }

    /// Read an extension claim. `None` if missing or of a different shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.extra
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn id(&self) -> Option<&str> {
        self.registered.id.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.registered.subject.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.registered.expires_at
    }
}

impl Claims for Session {
    fn registered(&self) -> &RegisteredClaims {
        &self.registered
    }

    fn registered_mut(&mut self) -> &mut RegisteredClaims {
        &mut self.registered
    }

    fn validate(&self) -> Result<(), TokenError> {
        self.registered.validate()?;
        if let Some(key) = self
            .extra
            .keys()
            .find(|k| REGISTERED_CLAIM_NAMES.contains(&k.as_str()))
        {
            return Err(TokenError::InvalidClaims(format!(
                "extension claim '{key}' shadows a registered claim"
            )));
        }
        Ok(())
    }
}
