//! Key management commands.
//!
//! `tokenward keys generate` - Generate a new HMAC key file.

use anyhow::Context;
use std::path::PathBuf;
use tokenward_jwt::{Algorithm, KeyFile};

/// Generate a new HMAC key file.
pub fn generate(alg: &str, kid: Option<String>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let alg: Algorithm = alg
        .parse()
        .with_context(|| format!("Unknown algorithm '{alg}'"))?;
    let key = KeyFile::generate_hmac(alg, kid)?;

    if let Some(output_path) = output {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        key.save_to_file(&output_path)
            .with_context(|| format!("Failed to write key to {}", output_path.display()))?;

        eprintln!("✔ Generated {alg:?} key: {}", output_path.display());
        if let Some(kid) = &key.kid {
            eprintln!("  Key ID: {kid}");
        }
        eprintln!();
        eprintln!("⚠️  Keep this key secure! Anyone holding it can mint tokens.");
    } else {
        println!("{}", key.to_json()?);
    }

    Ok(())
}
