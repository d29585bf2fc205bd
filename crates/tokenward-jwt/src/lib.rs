//! # tokenward-jwt
//!
//! Signed, claims-bearing JWTs for tokenward.
//!
//! This crate provides functionality for:
//! - Modelling a JWT claims set with typed registered claims and free-form
//!   extension claims
//! - Loading HMAC, RSA, EC and EdDSA keys from JSON key files
//! - Resolving verification keys from a single key or a key directory
//! - Issuing tokens and verifying them against time and audience rules
//!
//! ## Verification order
//!
//! | Step | Failure |
//! |------|---------|
//! | Parse compact form | [`VerifyError::TokenFormat`] |
//! | Resolve candidate keys | [`VerifyError::KeyStore`] |
//! | Check signature (first key that verifies wins) | [`VerifyError::SignatureInvalid`] |
//! | Decode claims | [`VerifyError::ClaimsDecode`] |
//! | `exp` / `nbf` with leeway | [`VerifyError::TokenExpired`] / [`VerifyError::TokenNotYetValid`] |
//! | `aud` against the audience predicate | [`VerifyError::AudienceRejected`] |
//!
//! Missing `exp`, `nbf` and `aud` claims skip their check.

pub mod claims;
pub mod clock;
pub mod codec;
pub mod error;
pub mod keys;
pub mod keystore;
pub mod signer;
pub mod token;

pub use claims::{Audience, ClaimsSet, IntDate, StringOrUri, Uri};
pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{Header, SignedToken, TokenInfo, inspect_token_unverified};
pub use error::{ClaimsError, FormatError, KeyError, KeyStoreError, SigningError, VerifyError};
pub use jsonwebtoken::Algorithm;
pub use keys::{KeyFile, SigningKey, VerificationKey};
pub use keystore::{KeyResolver, KeyStore};
pub use token::{TokenBuilder, TokenVerifier, Validation};
