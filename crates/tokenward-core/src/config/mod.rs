//! Configuration types for tokenward.
//!
//! Configuration is loaded from a single YAML file:
//!
//! ```yaml
//! signing:
//!   signing_key_file: keys/current.json
//!   default_lifetime: 1h
//! verify:
//!   keys_path: keys/
//!   audiences: [api, "urn:example:billing"]
//!   leeway_seconds: 30
//!   require_audience: true
//! ```
//!
//! Relative paths are resolved against the directory of the config file.

pub mod signing;
pub mod verify;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use signing::SigningConfig;
pub use verify::VerifyConfig;

/// Complete tokenward configuration loaded from a file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenwardConfig {
    /// Issuer settings.
    #[serde(default)]
    pub signing: SigningConfig,

    /// Relying-party settings.
    #[serde(default)]
    pub verify: VerifyConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TokenwardConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration and resolve relative paths against its directory.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(file) = &config.signing.signing_key_file {
            config.signing.signing_key_file = Some(relative_to(&base_dir, file));
        }
        if let Some(keys) = &config.verify.keys_path {
            config.verify.keys_path = Some(relative_to(&base_dir, keys));
        }

        Ok(config)
    }
}

fn relative_to(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
