//! Signing method identifiers and the registry that binds them to keys.
//!
//! A [`SigningMethod`] is a plain identifier. [`SigningMethod::bind`] pairs it
//! with [`KeyMaterial`] and yields a [`BoundMethod`], the sign/verify capability
//! the token codec works through. The cryptographic primitives come from
//! `jsonwebtoken`, except ES512 which is backed by `p521`.
//!
//! Identifier parsing fails closed: an unknown name or ordinal is an error,
//! never a silent fallback to a default method.

use crate::error::TokenError;
use crate::es512::Es512Keys;
use crate::keys::KeyMaterial;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;

/// Algorithm families. A verifier only ever accepts its own method, but the
/// family decides which kind of key material a method needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodFamily {
    Hmac,
    Ecdsa,
    EdDsa,
    RsaPkcs1,
    RsaPss,
}

/// The thirteen supported signing method identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SigningMethod {
    #[default]
    Hs256,
    Hs384,
    Hs512,
    Es256,
    Es384,
    Es512,
    EdDsa,
    Rs256,
    Rs384,
    Rs512,
    Ps256,
    Ps384,
    Ps512,
}

impl SigningMethod {
    /// All identifiers, in ordinal order.
    pub const ALL: [SigningMethod; 13] = [
        SigningMethod::Hs256,
        SigningMethod::Hs384,
        SigningMethod::Hs512,
        SigningMethod::Es256,
        SigningMethod::Es384,
        SigningMethod::Es512,
        SigningMethod::EdDsa,
        SigningMethod::Rs256,
        SigningMethod::Rs384,
        SigningMethod::Rs512,
        SigningMethod::Ps256,
        SigningMethod::Ps384,
        SigningMethod::Ps512,
    ];

    /// The `alg` header value.
    pub fn name(self) -> &'static str {
        match self {
            SigningMethod::Hs256 => "HS256",
            SigningMethod::Hs384 => "HS384",
            SigningMethod::Hs512 => "HS512",
            SigningMethod::Es256 => "ES256",
            SigningMethod::Es384 => "ES384",
            SigningMethod::Es512 => "ES512",
            SigningMethod::EdDsa => "EdDSA",
            SigningMethod::Rs256 => "RS256",
            SigningMethod::Rs384 => "RS384",
            SigningMethod::Rs512 => "RS512",
            SigningMethod::Ps256 => "PS256",
            SigningMethod::Ps384 => "PS384",
            SigningMethod::Ps512 => "PS512",
        }
    }

    pub fn family(self) -> MethodFamily {
        match self {
            SigningMethod::Hs256 | SigningMethod::Hs384 | SigningMethod::Hs512 => MethodFamily::Hmac,
            SigningMethod::Es256 | SigningMethod::Es384 | SigningMethod::Es512 => {
                MethodFamily::Ecdsa
            }
            SigningMethod::EdDsa => MethodFamily::EdDsa,
            SigningMethod::Rs256 | SigningMethod::Rs384 | SigningMethod::Rs512 => {
                MethodFamily::RsaPkcs1
            }
            SigningMethod::Ps256 | SigningMethod::Ps384 | SigningMethod::Ps512 => {
                MethodFamily::RsaPss
            }
        }
    }

    /// Whether identical input always yields an identical signature.
    /// ES256, ES384 and RSA-PSS use randomized signing. ES512 derives its
    /// nonce per RFC 6979.
    pub fn is_deterministic(self) -> bool {
        self == SigningMethod::Es512
            || matches!(
                self.family(),
                MethodFamily::Hmac | MethodFamily::EdDsa | MethodFamily::RsaPkcs1
            )
    }

    /// The `jsonwebtoken` algorithm, or `None` for ES512.
    pub fn algorithm(self) -> Option<Algorithm> {
        Some(match self {
            SigningMethod::Hs256 => Algorithm::HS256,
            SigningMethod::Hs384 => Algorithm::HS384,
            SigningMethod::Hs512 => Algorithm::HS512,
            SigningMethod::Es256 => Algorithm::ES256,
            SigningMethod::Es384 => Algorithm::ES384,
            SigningMethod::Es512 => return None,
            SigningMethod::EdDsa => Algorithm::EdDSA,
            SigningMethod::Rs256 => Algorithm::RS256,
            SigningMethod::Rs384 => Algorithm::RS384,
            SigningMethod::Rs512 => Algorithm::RS512,
            SigningMethod::Ps256 => Algorithm::PS256,
            SigningMethod::Ps384 => Algorithm::PS384,
            SigningMethod::Ps512 => Algorithm::PS512,
        })
    }

    /// Bind this method to key material.
    pub fn bind(self, key: &KeyMaterial) -> Result<BoundMethod, TokenError> {
        let Some(algorithm) = self.algorithm() else {
            return self.bind_es512(key);
        };

        let (encoding, decoding) = match (self.family(), key) {
            (MethodFamily::Hmac, KeyMaterial::Secret(secret)) => {
                if secret.is_empty() {
                    return Err(TokenError::InvalidKey("HMAC secret is empty".into()));
                }
                (
                    Some(EncodingKey::from_secret(secret)),
                    DecodingKey::from_secret(secret),
                )
            }
            (MethodFamily::Hmac, KeyMaterial::Pem { .. }) => {
                return Err(TokenError::InvalidKey(format!(
                    "{self} needs a shared secret, not a PEM key"
                )));
            }
            (_, KeyMaterial::Secret(_)) => {
                return Err(TokenError::InvalidKey(format!(
                    "{self} needs a PEM key pair, not a shared secret"
                )));
            }
            (family, KeyMaterial::Pem { private, public }) => {
                let encoding = private
                    .as_deref()
                    .map(|pem| match family {
                        MethodFamily::Ecdsa => EncodingKey::from_ec_pem(pem),
                        MethodFamily::EdDsa => EncodingKey::from_ed_pem(pem),
                        _ => EncodingKey::from_rsa_pem(pem),
                    })
                    .transpose()
                    .map_err(|e| TokenError::InvalidKey(format!("private key: {e}")))?;
                let decoding = match family {
                    MethodFamily::Ecdsa => DecodingKey::from_ec_pem(public),
                    MethodFamily::EdDsa => DecodingKey::from_ed_pem(public),
                    _ => DecodingKey::from_rsa_pem(public),
                }
                .map_err(|e| TokenError::InvalidKey(format!("public key: {e}")))?;
                (encoding, decoding)
            }
        };

        Ok(BoundMethod {
            method: self,
            backend: Backend::Jwt {
                algorithm,
                encoding,
                decoding,
            },
        })
    }

    fn bind_es512(self, key: &KeyMaterial) -> Result<BoundMethod, TokenError> {
        let KeyMaterial::Pem { private, public } = key else {
            return Err(TokenError::InvalidKey(format!(
                "{self} needs a PEM key pair, not a shared secret"
            )));
        };
        Ok(BoundMethod {
            method: self,
            backend: Backend::Es512(Es512Keys::from_pem(private.as_deref(), public)?),
        })
    }
}

impl fmt::Display for SigningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SigningMethod {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SigningMethod::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TokenError::UnsupportedSigningMethod(s.to_string()))
    }
}

impl TryFrom<u8> for SigningMethod {
    type Error = TokenError;

    fn try_from(ordinal: u8) -> Result<Self, Self::Error> {
        SigningMethod::ALL
            .get(usize::from(ordinal))
            .copied()
            .ok_or_else(|| TokenError::UnsupportedSigningMethod(format!("ordinal {ordinal}")))
    }
}

/// A signing method bound to its keys.
pub struct BoundMethod {
    method: SigningMethod,
    backend: Backend,
}

enum Backend {
    Jwt {
        algorithm: Algorithm,
        encoding: Option<EncodingKey>,
        decoding: DecodingKey,
    },
    Es512(Es512Keys),
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("method", &self.method)
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

impl BoundMethod {
    pub fn method(&self) -> SigningMethod {
        self.method
    }

    pub fn can_sign(&self) -> bool {
        match &self.backend {
            Backend::Jwt { encoding, .. } => encoding.is_some(),
            Backend::Es512(keys) => keys.can_sign(),
        }
    }

    /// Sign `claims` into `header.payload.signature`.
    pub(crate) fn sign<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        match &self.backend {
            Backend::Jwt {
                algorithm,
                encoding,
                ..
            } => {
                let key = encoding.as_ref().ok_or(TokenError::MissingSigningKey)?;
                Ok(jsonwebtoken::encode(&Header::new(*algorithm), claims, key)?)
            }
            Backend::Es512(keys) => {
                let header = serde_json::json!({ "typ": "JWT", "alg": self.method.name() });
                let header = serde_json::to_vec(&header)
                    .map_err(|e| TokenError::Signing(e.to_string()))?;
                let payload =
                    serde_json::to_vec(claims).map_err(|e| TokenError::Signing(e.to_string()))?;
                let input = format!(
                    "{}.{}",
                    URL_SAFE_NO_PAD.encode(header),
                    URL_SAFE_NO_PAD.encode(payload)
                );
                let signature = keys.sign(input.as_bytes())?;
                Ok(format!("{input}.{}", URL_SAFE_NO_PAD.encode(signature)))
            }
        }
    }

    /// Check the signature and decode the payload. No claim is judged here.
    pub(crate) fn verify<C: DeserializeOwned + Clone>(&self, token: &str) -> Result<C, TokenError> {
        match &self.backend {
            Backend::Jwt {
                algorithm,
                decoding,
                ..
            } => {
                let mut validation = Validation::new(*algorithm);
                validation.required_spec_claims.clear();
                validation.validate_exp = false;
                validation.validate_nbf = false;
                validation.validate_aud = false;
                validation.leeway = 0;
                Ok(jsonwebtoken::decode::<C>(token, decoding, &validation)?.claims)
            }
            Backend::Es512(keys) => {
                let (input, signature) = token
                    .rsplit_once('.')
                    .ok_or_else(|| TokenError::Malformed("missing signature segment".into()))?;
                let signature = URL_SAFE_NO_PAD
                    .decode(signature)
                    .map_err(|e| TokenError::Malformed(format!("signature is not base64url: {e}")))?;
                keys.verify(input.as_bytes(), &signature)?;

                let payload = input.split('.').nth(1).unwrap_or_default();
                let bytes = URL_SAFE_NO_PAD
                    .decode(payload)
                    .map_err(|e| TokenError::Malformed(format!("payload is not base64url: {e}")))?;
                serde_json::from_slice(&bytes)
                    .map_err(|e| TokenError::Malformed(format!("payload does not decode: {e}")))
            }
        }
    }
}
