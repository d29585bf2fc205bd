//! Signing and signature checks, delegated to `jsonwebtoken`.

use crate::claims::ClaimsSet;
use crate::codec::{Header, SignedToken, encode_segment};
use crate::error::SigningError;
use crate::keys::{SigningKey, VerificationKey};

/// Sign `claims` under `header` with `key`.
pub fn sign(
    key: &SigningKey,
    header: Header,
    claims: &ClaimsSet,
) -> Result<SignedToken, SigningError> {
    if header.alg != key.algorithm() {
        return Err(SigningError::AlgorithmMismatch {
            header: header.alg,
            key: key.algorithm(),
        });
    }

    let header_json = serde_json::to_vec(&header)?;
    let payload = serde_json::to_vec(claims)?;
    let signing_input = format!(
        "{}.{}",
        encode_segment(&header_json),
        encode_segment(&payload)
    );

    let signature =
        jsonwebtoken::crypto::sign(signing_input.as_bytes(), key.encoding_key(), header.alg)
            .map_err(|e| SigningError::SignatureFailed(e.to_string()))?;

    Ok(SignedToken::from_parts(
        header,
        signing_input,
        payload,
        signature,
    ))
}

/// Check the signature of `token` against `key`.
///
/// A key whose algorithm differs from the header's never verifies.
pub fn verify(
    key: &VerificationKey,
    token: &SignedToken,
) -> Result<bool, jsonwebtoken::errors::Error> {
    if key.algorithm() != token.header().alg {
        return Ok(false);
    }
    jsonwebtoken::crypto::verify(
        token.signature(),
        token.signing_input().as_bytes(),
        key.decoding_key(),
        key.algorithm(),
    )
}
