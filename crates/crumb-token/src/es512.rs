//! ES512: ECDSA over P-521 with SHA-512.
//!
//! `jsonwebtoken` has no P-521 primitive, so ES512 tokens are signed and
//! verified here over the same `header.payload` signing input. Signatures are
//! the fixed-width `r || s` encoding (132 bytes) that JWS requires.

use crate::error::TokenError;
use p521::ecdsa::signature::{Signer, Verifier};
use p521::ecdsa::{Signature, SigningKey, VerifyingKey};
use p521::pkcs8::{DecodePrivateKey, DecodePublicKey};
use p521::{PublicKey, SecretKey};

pub(crate) struct Es512Keys {
    signing: Option<SigningKey>,
    verifying: VerifyingKey,
}

impl Es512Keys {
    /// Parse a PKCS#8 private key (optional) and an SPKI public key.
    pub(crate) fn from_pem(private: Option<&[u8]>, public: &[u8]) -> Result<Self, TokenError> {
        let signing = private
            .map(|pem| {
                let secret = SecretKey::from_pkcs8_pem(pem_str(pem)?)
                    .map_err(|e| TokenError::InvalidKey(format!("private key: {e}")))?;
                SigningKey::from_bytes(&secret.to_bytes())
                    .map_err(|e| TokenError::InvalidKey(format!("private key: {e}")))
            })
            .transpose()?;

        let public = PublicKey::from_public_key_pem(pem_str(public)?)
            .map_err(|e| TokenError::InvalidKey(format!("public key: {e}")))?;
        let verifying = VerifyingKey::from_sec1_bytes(&public.to_sec1_bytes())
            .map_err(|e| TokenError::InvalidKey(format!("public key: {e}")))?;

        Ok(Self { signing, verifying })
    }

    pub(crate) fn can_sign(&self) -> bool {
        self.signing.is_some()
    }

    pub(crate) fn sign(&self, input: &[u8]) -> Result<Vec<u8>, TokenError> {
        let key = self.signing.as_ref().ok_or(TokenError::MissingSigningKey)?;
        let signature: Signature = key
            .try_sign(input)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(signature.to_bytes().to_vec())
    }

    pub(crate) fn verify(&self, input: &[u8], signature: &[u8]) -> Result<(), TokenError> {
        let signature = Signature::from_slice(signature).map_err(|_| TokenError::InvalidSignature)?;
        self.verifying
            .verify(input, &signature)
            .map_err(|_| TokenError::InvalidSignature)
    }
}

fn pem_str(pem: &[u8]) -> Result<&str, TokenError> {
    std::str::from_utf8(pem).map_err(|_| TokenError::InvalidKey("PEM is not UTF-8".into()))
}
