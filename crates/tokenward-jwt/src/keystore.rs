//! Key stores: where verification keys come from.
//!
//! A [`KeyStore`] is either a single key held in memory or a directory of key
//! files read on every lookup. Both resolve through [`KeyResolver`], which
//! yields the ordered list of candidate keys for a token.

use crate::error::KeyStoreError;
use crate::keys::{KeyFile, VerificationKey};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves the candidate keys for a token.
pub trait KeyResolver {
    /// Candidate keys in the order they should be tried.
    ///
    /// `kid` is the key identifier from the token header, if any. Keys with a
    /// matching identifier come first, but others are not dropped.
    fn resolve(&self, kid: Option<&str>) -> Result<Vec<VerificationKey>, KeyStoreError>;
}

/// A source of verification keys.
#[derive(Debug, Clone)]
pub enum KeyStore {
    /// One key, used for every token.
    Single(VerificationKey),
    /// A directory of key files, loaded lazily on each lookup.
    Directory(PathBuf),
}

impl KeyStore {
    /// Open a key file or key directory.
    pub fn open(path: &Path) -> Result<Self, KeyStoreError> {
        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }
        KeyFile::load_from_file(path)
            .and_then(|file| file.verification_key())
            .map(Self::Single)
            .map_err(|source| KeyStoreError::InvalidKey {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl KeyResolver for KeyStore {
    fn resolve(&self, kid: Option<&str>) -> Result<Vec<VerificationKey>, KeyStoreError> {
        match self {
            Self::Single(key) => Ok(vec![key.clone()]),
            Self::Directory(path) => resolve_directory(path, kid),
        }
    }
}

fn resolve_directory(
    path: &Path,
    kid: Option<&str>,
) -> Result<Vec<VerificationKey>, KeyStoreError> {
    if !path.is_dir() {
        return Err(KeyStoreError::NotADirectory(path.to_path_buf()));
    }

    let io_error = |source| KeyStoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut keys = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_error)? {
        let entry_path = entry.map_err(io_error)?.path();
        if !entry_path.is_file() {
            continue;
        }
        match KeyFile::load_from_file(&entry_path).and_then(|file| file.verification_key()) {
            Ok(key) => keys.push(key),
            Err(e) => debug!(path = %entry_path.display(), error = %e, "skipping non-key file"),
        }
    }

    if keys.is_empty() {
        return Err(KeyStoreError::NoUsableKeys(path.to_path_buf()));
    }

    // Stable sort: matching kids first, directory order otherwise.
    if let Some(kid) = kid {
        keys.sort_by_key(|key| key.kid() != Some(kid));
    }

    debug!(dir = %path.display(), candidates = keys.len(), "resolved key directory");
    Ok(keys)
}
