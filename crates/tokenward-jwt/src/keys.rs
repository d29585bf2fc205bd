//! Key material for signing and verifying tokens.
//!
//! Keys live in small JSON key files:
//!
//! ```json
//! { "kid": "2024-01", "alg": "HS256", "secret": "<base64url>" }
//! { "kid": "edge", "alg": "EdDSA", "private_pem": "...", "public_pem": "..." }
//! ```
//!
//! HMAC keys carry a base64url `secret`. RSA, EC and EdDSA keys carry PEM
//! documents; signing needs `private_pem` and verification needs `public_pem`.

use crate::codec::Header;
use crate::error::KeyError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The on-disk representation of a key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFile {
    /// Key identifier, copied into the `kid` header of issued tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Signature algorithm this key is used with.
    pub alg: Algorithm,

    /// Base64url HMAC secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// PEM private key (RSA, EC or EdDSA).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_pem: Option<String>,

    /// PEM public key (RSA, EC or EdDSA).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_pem: Option<String>,
}

impl KeyFile {
    /// Generate a new random HMAC key sized to the algorithm's digest.
    pub fn generate_hmac(alg: Algorithm, kid: Option<String>) -> Result<Self, KeyError> {
        let len = match alg {
            Algorithm::HS256 => 32,
            Algorithm::HS384 => 48,
            Algorithm::HS512 => 64,
            other => {
                return Err(KeyError::UnsupportedAlgorithm(format!(
                    "{other:?} keys cannot be generated, only HS256/HS384/HS512"
                )));
            }
        };

        let mut rng = rand::rng();
        let mut bytes = vec![0u8; len];
        rng.fill_bytes(&mut bytes);

        Ok(Self {
            kid,
            alg,
            secret: Some(URL_SAFE_NO_PAD.encode(&bytes)),
            private_pem: None,
            public_pem: None,
        })
    }

    /// Parse a key file from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, KeyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the key file as pretty JSON.
    pub fn to_json(&self) -> Result<String, KeyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build the signing half of this key.
    pub fn signing_key(&self) -> Result<SigningKey, KeyError> {
        let key = if is_hmac(self.alg) {
            EncodingKey::from_secret(&self.secret_bytes()?)
        } else {
            let pem = self
                .private_pem
                .as_deref()
                .ok_or(KeyError::MissingMaterial("private_pem"))?
                .as_bytes();
            let parsed = if is_rsa(self.alg) {
                EncodingKey::from_rsa_pem(pem)
            } else if is_ec(self.alg) {
                EncodingKey::from_ec_pem(pem)
            } else {
                EncodingKey::from_ed_pem(pem)
            };
            parsed.map_err(|e| KeyError::InvalidMaterial(e.to_string()))?
        };

        Ok(SigningKey {
            kid: self.kid.clone(),
            algorithm: self.alg,
            key,
        })
    }

    /// Build the verification half of this key.
    pub fn verification_key(&self) -> Result<VerificationKey, KeyError> {
        let key = if is_hmac(self.alg) {
            DecodingKey::from_secret(&self.secret_bytes()?)
        } else {
            let pem = self
                .public_pem
                .as_deref()
                .ok_or(KeyError::MissingMaterial("public_pem"))?
                .as_bytes();
            let parsed = if is_rsa(self.alg) {
                DecodingKey::from_rsa_pem(pem)
            } else if is_ec(self.alg) {
                DecodingKey::from_ec_pem(pem)
            } else {
                DecodingKey::from_ed_pem(pem)
            };
            parsed.map_err(|e| KeyError::InvalidMaterial(e.to_string()))?
        };

        Ok(VerificationKey {
            kid: self.kid.clone(),
            algorithm: self.alg,
            key,
        })
    }

    /// Save the key file as JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<(), KeyError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a key file from disk.
    pub fn load_from_file(path: &Path) -> Result<Self, KeyError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn secret_bytes(&self) -> Result<Vec<u8>, KeyError> {
        let secret = self
            .secret
            .as_deref()
            .ok_or(KeyError::MissingMaterial("secret"))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(secret.trim_end_matches('='))
            .map_err(|e| KeyError::InvalidMaterial(e.to_string()))?;
        if bytes.is_empty() {
            return Err(KeyError::InvalidMaterial("secret is empty".to_string()));
        }
        Ok(bytes)
    }
}

fn is_hmac(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

fn is_rsa(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

fn is_ec(alg: Algorithm) -> bool {
    matches!(alg, Algorithm::ES256 | Algorithm::ES384)
}

/// A key that can sign tokens.
#[derive(Clone)]
pub struct SigningKey {
    kid: Option<String>,
    algorithm: Algorithm,
    key: EncodingKey,
}

impl SigningKey {
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Derive the token header from this key.
    ///
    /// `alg` and `kid` always come from the key, so a header can never
    /// announce a different key than the one that signed it.
    pub fn header(&self) -> Header {
        Header {
            alg: self.algorithm,
            typ: Some("JWT".to_string()),
            kid: self.kid.clone(),
        }
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// A key that can verify token signatures.
#[derive(Clone)]
pub struct VerificationKey {
    kid: Option<String>,
    algorithm: Algorithm,
    key: DecodingKey,
}

impl VerificationKey {
    pub fn kid(&self) -> Option<&str> {
        self.kid.as_deref()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_generate_hmac_sizes() {
        for (alg, len) in [
            (Algorithm::HS256, 32),
            (Algorithm::HS384, 48),
            (Algorithm::HS512, 64),
        ] {
            let key = KeyFile::generate_hmac(alg, None).unwrap();
            let bytes = key.secret_bytes().unwrap();
            assert_eq!(bytes.len(), len);
        }
    }

    #[test]
    fn test_generate_rejects_asymmetric() {
        let err = KeyFile::generate_hmac(Algorithm::RS256, None).unwrap_err();
        assert!(matches!(err, KeyError::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn test_key_file_save_load() {
        let key = KeyFile::generate_hmac(Algorithm::HS256, Some("k1".into())).unwrap();
        let file = NamedTempFile::new().unwrap();
        key.save_to_file(file.path()).unwrap();

        let loaded = KeyFile::load_from_file(file.path()).unwrap();
        assert_eq!(loaded.kid.as_deref(), Some("k1"));
        assert_eq!(loaded.alg, Algorithm::HS256);
        assert_eq!(loaded.secret, key.secret);
    }

    #[test]
    fn test_header_comes_from_key() {
        let key = KeyFile::generate_hmac(Algorithm::HS384, Some("rotating".into()))
            .unwrap()
            .signing_key()
            .unwrap();
        let header = key.header();
        assert_eq!(header.alg, Algorithm::HS384);
        assert_eq!(header.kid.as_deref(), Some("rotating"));
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_missing_material() {
        let key = KeyFile::from_json(r#"{"alg": "HS256"}"#).unwrap();
        assert!(matches!(
            key.signing_key(),
            Err(KeyError::MissingMaterial("secret"))
        ));

        let key = KeyFile::from_json(r#"{"alg": "RS256", "private_pem": "x"}"#).unwrap();
        assert!(matches!(
            key.verification_key(),
            Err(KeyError::MissingMaterial("public_pem"))
        ));
        assert!(matches!(
            key.signing_key(),
            Err(KeyError::InvalidMaterial(_))
        ));
    }

    #[test]
    fn test_not_a_key_file() {
        assert!(matches!(
            KeyFile::from_json("# just a readme"),
            Err(KeyError::Parse(_))
        ));
        assert!(KeyFile::from_json(r#"{"alg": "none", "secret": "AAAA"}"#).is_err());
    }
}
