//! Relying-party validation policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How tokens are verified.
///
/// The permissive defaults accept tokens without an `aud` claim and try
/// every key in the store regardless of `kid`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VerifyConfig {
    /// Environment variable holding the key file or key directory path.
    #[serde(default)]
    pub keys_env: Option<String>,

    /// Key file or key directory.
    #[serde(default)]
    pub keys_path: Option<PathBuf>,

    /// Audiences this relying party accepts.
    #[serde(default)]
    pub audiences: Vec<String>,

    /// Allowed clock skew, in seconds, for `exp` and `nbf`.
    #[serde(default)]
    pub leeway_seconds: u64,

    /// Reject tokens that carry no `aud` claim.
    #[serde(default)]
    pub require_audience: bool,

    /// Only try keys whose `kid` matches the token header.
    #[serde(default)]
    pub require_key_id_match: bool,
}

impl VerifyConfig {
    /// Resolve the key store path from environment or config.
    pub fn resolve_keys_path(&self) -> Option<PathBuf> {
        if let Some(env_var) = &self.keys_env {
            if let Ok(path) = std::env::var(env_var) {
                return Some(PathBuf::from(path));
            }
        }
        self.keys_path.clone()
    }
}
