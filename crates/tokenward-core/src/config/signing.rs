//! Signing key configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the issuer's signing key comes from.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SigningConfig {
    /// Environment variable containing the key file JSON (or a path to it).
    #[serde(default)]
    pub signing_key_env: Option<String>,

    /// Path to the signing key file.
    #[serde(default)]
    pub signing_key_file: Option<PathBuf>,

    /// Default lifetime for newly minted tokens (e.g., "1h", "7d").
    #[serde(default)]
    pub default_lifetime: Option<String>,
}

impl SigningConfig {
    /// Resolve the signing key source from environment or file.
    ///
    /// The environment value is returned verbatim; it may be inline JSON or
    /// a path. The file is read and its contents returned.
    pub fn resolve_signing_key(&self) -> Result<Option<String>, std::io::Error> {
        // Try environment variable first
        if let Some(env_var) = &self.signing_key_env {
            if let Ok(key) = std::env::var(env_var) {
                return Ok(Some(key));
            }
        }

        // Try file path
        if let Some(path) = &self.signing_key_file {
            if path.exists() {
                let key = std::fs::read_to_string(path)?;
                return Ok(Some(key.trim().to_string()));
            }
        }

        Ok(None)
    }
}
