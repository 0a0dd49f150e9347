//! Key material for signing and verifying tokens.

use crate::error::TokenError;
use crate::method::{MethodFamily, SigningMethod};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use crumb_core::SigningConfig;
use rand::RngCore;
use std::fmt;

/// Default number of random bytes in a generated HMAC secret.
pub const DEFAULT_SECRET_LEN: usize = 32;

/// Key material paired with a signing method at configuration time.
#[derive(Clone)]
pub enum KeyMaterial {
    /// Shared secret for HMAC methods.
    Secret(Vec<u8>),
    /// PEM-encoded key pair for asymmetric methods. Without the private half
    /// the key can only verify.
    Pem {
        private: Option<Vec<u8>>,
        public: Vec<u8>,
    },
}

// Never print key bytes.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMaterial::Secret(bytes) => f
                .debug_tuple("Secret")
                .field(&format_args!("<{} bytes>", bytes.len()))
                .finish(),
            KeyMaterial::Pem { private, .. } => f
                .debug_struct("Pem")
                .field("private", &private.as_ref().map(|_| "<redacted>"))
                .field("public", &"<pem>")
                .finish(),
        }
    }
}

impl KeyMaterial {
    /// An HMAC secret.
    pub fn secret(bytes: impl Into<Vec<u8>>) -> Self {
        KeyMaterial::Secret(bytes.into())
    }

    /// A full PEM key pair.
    pub fn pem(private: impl Into<Vec<u8>>, public: impl Into<Vec<u8>>) -> Self {
        KeyMaterial::Pem {
            private: Some(private.into()),
            public: public.into(),
        }
    }

    /// A verification-only PEM public key.
    pub fn public_pem(public: impl Into<Vec<u8>>) -> Self {
        KeyMaterial::Pem {
            private: None,
            public: public.into(),
        }
    }

    /// Whether the material can produce signatures.
    pub fn can_sign(&self) -> bool {
        match self {
            KeyMaterial::Secret(_) => true,
            KeyMaterial::Pem { private, .. } => private.is_some(),
        }
    }

    /// Resolve key material for `method` from configuration.
    pub fn from_config(config: &SigningConfig, method: SigningMethod) -> Result<Self, TokenError> {
        if method.family() == MethodFamily::Hmac {
            let secret = config.resolve_secret()?.ok_or_else(|| {
                TokenError::InvalidKey(format!(
                    "{method} needs a secret; set {} or signing.secret_file",
                    config.secret_env.as_deref().unwrap_or("signing.secret_env")
                ))
            })?;
            return Ok(Self::secret(secret));
        }

        let public = config.resolve_public_key_pem()?.ok_or_else(|| {
            TokenError::InvalidKey(format!("{method} needs signing.public_key_file"))
        })?;
        let private = config.resolve_private_key_pem()?;
        Ok(KeyMaterial::Pem { private, public })
    }
}

/// Generate a random HMAC secret as URL-safe base64 text.
pub fn generate_secret(len: usize) -> String {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
