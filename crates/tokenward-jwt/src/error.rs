//! Error types for the JWT crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while decoding a claims set.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The claims set root is not a JSON object.
    #[error("claims set must be a JSON object")]
    NotAnObject,

    /// A registered claim is present but has the wrong shape.
    #[error("claim '{claim}' is invalid: {reason}")]
    InvalidClaim { claim: &'static str, reason: String },

    /// A value containing ':' failed to parse as a URI.
    #[error("invalid URI '{value}': {reason}")]
    InvalidUri { value: String, reason: String },

    /// An extension claim tried to use a registered claim name.
    #[error("'{0}' is a registered claim and cannot be set as an extension")]
    ReservedClaim(String),

    /// The payload is not valid JSON.
    #[error("claims set is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    /// Failed to parse the key file.
    #[error("failed to parse key file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The key file does not carry the material needed for this use.
    #[error("key is missing {0}")]
    MissingMaterial(&'static str),

    /// The key material could not be decoded.
    #[error("invalid key material: {0}")]
    InvalidMaterial(String),

    /// The algorithm is not supported for this operation.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// IO error (reading/writing keys).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a misconfigured or empty key store.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// The configured key directory is not a directory.
    #[error("key store path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The key directory holds no file that decodes as a key.
    #[error("key directory contains no usable keys: {}", .0.display())]
    NoUsableKeys(PathBuf),

    /// A single key file could not be loaded.
    #[error("failed to load key {}: {source}", .path.display())]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: KeyError,
    },

    /// The key directory could not be listed.
    #[error("failed to read key directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Malformed compact serialization.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct FormatError(pub String);

/// Errors that can occur while issuing a token.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The header or claims could not be serialized.
    #[error("failed to encode token: {0}")]
    Encode(#[from] serde_json::Error),

    /// The header algorithm does not match the signing key.
    #[error("header algorithm {header:?} does not match key algorithm {key:?}")]
    AlgorithmMismatch {
        header: jsonwebtoken::Algorithm,
        key: jsonwebtoken::Algorithm,
    },

    /// The signature primitive failed.
    #[error("failed to sign token: {0}")]
    SignatureFailed(String),
}

/// Reasons a token can be rejected by verification.
///
/// Checks run in a fixed order and the first failure wins: format, key
/// store, signature, claims decode, expiration, not-before, audience.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The compact serialization is malformed.
    #[error("malformed token: {0}")]
    TokenFormat(#[from] FormatError),

    /// The key store is misconfigured or empty.
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    /// No candidate key verified the signature.
    #[error("invalid signature")]
    SignatureInvalid,

    /// The signed payload is not a valid claims set.
    #[error("invalid claims: {0}")]
    ClaimsDecode(#[from] ClaimsError),

    /// Token has expired.
    #[error("token has expired at {expired_at}")]
    TokenExpired { expired_at: String },

    /// Token is not valid yet.
    #[error("token is not valid before {not_before}")]
    TokenNotYetValid { not_before: String },

    /// No audience in the token is accepted.
    #[error("token audience is not accepted")]
    AudienceRejected,

    /// An audience claim is required but absent.
    #[error("token has no audience claim")]
    AudienceRequired,
}
