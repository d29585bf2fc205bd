//! Compact serialization: `base64url(header).base64url(payload).base64url(signature)`.

use crate::error::FormatError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The protected header of a token.
///
/// Unknown header parameters are ignored when parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Signature algorithm.
    pub alg: Algorithm,

    /// Media type, usually `JWT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Identifier of the signing key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

/// A token split into its parts.
///
/// Produced either by signing or by [`SignedToken::decode_compact`]; the
/// signature has not been checked in the latter case.
#[derive(Debug, Clone)]
pub struct SignedToken {
    header: Header,
    signing_input: String,
    payload: Vec<u8>,
    signature: String,
}

impl SignedToken {
    pub(crate) fn from_parts(
        header: Header,
        signing_input: String,
        payload: Vec<u8>,
        signature: String,
    ) -> Self {
        Self {
            header,
            signing_input,
            payload,
            signature,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Decoded payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The `header.payload` text the signature covers.
    pub fn signing_input(&self) -> &str {
        &self.signing_input
    }

    /// Base64url signature segment.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Serialize to compact form.
    pub fn encode_compact(&self) -> String {
        format!("{}.{}", self.signing_input, self.signature)
    }

    /// Parse compact form. The signature is not checked.
    pub fn decode_compact(token: &str) -> Result<Self, FormatError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = segments.as_slice() else {
            return Err(FormatError(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        let header_bytes = decode_segment("header", header_b64)?;
        let header: Header = serde_json::from_slice(&header_bytes)
            .map_err(|e| FormatError(format!("invalid header: {e}")))?;
        let payload = decode_segment("payload", payload_b64)?;
        decode_segment("signature", signature_b64)?;

        Ok(Self {
            header,
            signing_input: format!("{header_b64}.{payload_b64}"),
            payload,
            signature: signature_b64.to_string(),
        })
    }
}

/// Encode bytes as an unpadded base64url segment.
pub(crate) fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>, FormatError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| FormatError(format!("invalid base64url in {name}: {e}")))
}

/// Information about a token (for inspection).
#[derive(Debug, Clone)]
pub struct TokenInfo {
    /// The parsed header.
    pub header: Header,
    /// The payload as raw JSON, unvalidated.
    pub payload: Value,
}

/// Inspect a token without verification (for debugging).
pub fn inspect_token_unverified(token: &str) -> Result<TokenInfo, FormatError> {
    let signed = SignedToken::decode_compact(token)?;
    let payload = serde_json::from_slice(signed.payload())
        .map_err(|e| FormatError(format!("payload is not JSON: {e}")))?;
    Ok(TokenInfo {
        header: signed.header,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compact(header: &Value, payload: &Value, signature: &[u8]) -> String {
        format!(
            "{}.{}.{}",
            encode_segment(header.to_string().as_bytes()),
            encode_segment(payload.to_string().as_bytes()),
            encode_segment(signature)
        )
    }

    #[test]
    fn test_decode_compact_parts() {
        let token = compact(
            &json!({"alg": "HS256", "kid": "k1", "x5t": "ignored"}),
            &json!({"sub": "alice"}),
            b"sig",
        );
        let signed = SignedToken::decode_compact(&token).unwrap();

        assert_eq!(signed.header().alg, Algorithm::HS256);
        assert_eq!(signed.header().kid.as_deref(), Some("k1"));
        assert_eq!(signed.payload(), br#"{"sub":"alice"}"#);
        assert_eq!(signed.encode_compact(), token);
    }

    #[test]
    fn test_wrong_segment_count() {
        for token in ["", "a", "a.b", "a.b.c.d"] {
            let err = SignedToken::decode_compact(token).unwrap_err();
            assert!(err.0.contains("segments"), "{token}: {err}");
        }
    }

    #[test]
    fn test_invalid_segments() {
        let good = compact(&json!({"alg": "HS256"}), &json!({}), b"sig");
        let parts: Vec<&str> = good.split('.').collect();

        let bad_b64 = format!("{}.!!!.{}", parts[0], parts[2]);
        assert!(SignedToken::decode_compact(&bad_b64).is_err());

        let no_alg = compact(&json!({"typ": "JWT"}), &json!({}), b"sig");
        assert!(SignedToken::decode_compact(&no_alg).is_err());

        let alg_none = compact(&json!({"alg": "none"}), &json!({}), b"");
        assert!(SignedToken::decode_compact(&alg_none).is_err());
    }

    #[test]
    fn test_inspect_unverified() {
        let token = compact(&json!({"alg": "RS256"}), &json!({"aud": ["x"]}), b"sig");
        let info = inspect_token_unverified(&token).unwrap();
        assert_eq!(info.header.alg, Algorithm::RS256);
        assert_eq!(info.payload, json!({"aud": ["x"]}));
    }
}
