//! # crumb-token
//!
//! Signed JWT claim sets for Crumb sessions.
//!
//! This crate provides functionality for:
//! - Describing session claims (registered JWT claims plus extension claims)
//! - Binding one of thirteen signing methods to key material
//! - Serializing claims into compact `header.payload.signature` tokens
//! - Verifying tokens and judging expiry against a caller-supplied clock
//!
//! ## Verification Order
//!
//! | Step | Failure |
//! |------|---------|
//! | Three base64url segments, JSON header, JSON object payload | `Malformed` |
//! | Header `alg` equals the configured method | `AlgorithmMismatch` |
//! | Signature over `header.payload` | `InvalidSignature` |
//! | Issuer and audience, when configured | `InvalidClaims` |
//! | `exp` and `nbf` against `now` plus leeway | `Expired` / `NotYetActive` |
//!
//! A verifier accepts exactly one method. There is no `none` and no
//! fallback between families.

pub mod claims;
pub mod error;
mod es512;
pub mod keys;
pub mod lifecycle;
pub mod method;
pub mod token;

pub use claims::{Audience, Claims, REGISTERED_CLAIM_NAMES, RegisteredClaims, Session};
pub use error::{TokenError, TokenErrorKind};
pub use keys::{DEFAULT_SECRET_LEN, KeyMaterial, generate_secret};
pub use lifecycle::{Lifecycle, truncate_to_seconds};
pub use method::{BoundMethod, MethodFamily, SigningMethod};
pub use token::{SessionCodec, TokenInfo, TokenSigner, inspect_unverified};
