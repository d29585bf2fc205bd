//! Token management commands.
//!
//! `tokenward token mint` - Sign a claims set into a token.
//! `tokenward token verify` - Verify a token and print its claims.
//! `tokenward token inspect` - Show a token's header and payload without verifying.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokenward_core::{SigningConfig, VerifyConfig};
use tokenward_jwt::{
    Audience, ClaimsSet, IntDate, KeyFile, KeyStore, SigningKey, StringOrUri, TokenBuilder,
    TokenVerifier, Validation, inspect_token_unverified,
};
use tracing::debug;

/// Claim options for `token mint`.
#[derive(Debug, Default)]
pub struct MintOptions {
    /// Claims JSON: a file path, `-` for stdin, or inline JSON.
    pub claims: Option<String>,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub audience: Vec<String>,
    /// Lifetime from now, e.g. "1h".
    pub expires: Option<String>,
    /// Delay from now before the token becomes valid.
    pub not_before: Option<String>,
    pub token_id: Option<String>,
    pub output: Option<PathBuf>,
}

/// Policy options for `token verify`. Unset values fall back to config.
#[derive(Debug, Default)]
pub struct VerifyOptions {
    pub keys: Option<PathBuf>,
    pub audiences: Vec<String>,
    pub leeway: Option<u64>,
    pub require_audience: bool,
    pub require_kid_match: bool,
}

/// Read an argument that is `-` (stdin), a path to a file, or literal text.
fn read_input(arg: &str) -> anyhow::Result<String> {
    if arg == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        return Ok(buffer.trim().to_string());
    }

    let path = Path::new(arg);
    if path.is_file() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(content.trim().to_string());
    }

    Ok(arg.trim().to_string())
}

/// Resolve the signing key from a flag, falling back to config.
///
/// The key string can be a path to a key file or the key file JSON itself.
pub fn resolve_signing_key(
    key: Option<String>,
    config: &SigningConfig,
) -> anyhow::Result<SigningKey> {
    let key_str = match key {
        Some(key) => read_input(&key)?,
        None => config.resolve_signing_key()?.context(
            "Signing key not provided. Either pass --key <path> or set TOKENWARD_SIGNING_KEY",
        )?,
    };

    let key_str = if Path::new(&key_str).is_file() {
        read_input(&key_str)?
    } else {
        key_str
    };

    KeyFile::from_json(&key_str)
        .and_then(|file| file.signing_key())
        .context("Failed to load signing key. Expected a tokenward key file")
}

/// Resolve the key store from a flag, falling back to config.
pub fn resolve_key_store(keys: Option<PathBuf>, config: &VerifyConfig) -> anyhow::Result<KeyStore> {
    let path = keys.or_else(|| config.resolve_keys_path()).context(
        "Verification keys not provided. Either pass --keys <file|dir> or set TOKENWARD_KEYS",
    )?;
    KeyStore::open(&path)
        .with_context(|| format!("Failed to open key store at {}", path.display()))
}

/// Parse a duration string like "24h", "7d", "30m" or "90s".
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim().to_lowercase();

    let (digits, unit): (&str, fn(i64) -> Option<Duration>) =
        if let Some(days) = s.strip_suffix('d') {
            (days, Duration::try_days)
        } else if let Some(hours) = s.strip_suffix('h') {
            (hours, Duration::try_hours)
        } else if let Some(minutes) = s.strip_suffix('m') {
            (minutes, Duration::try_minutes)
        } else if let Some(seconds) = s.strip_suffix('s') {
            (seconds, Duration::try_seconds)
        } else {
            (s.as_str(), Duration::try_seconds)
        };

    let amount: i64 = digits
        .parse()
        .with_context(|| format!("Invalid duration '{s}'"))?;
    unit(amount).with_context(|| format!("Duration '{s}' is out of range"))
}

fn offset_date(now: DateTime<Utc>, offset: &str) -> anyhow::Result<IntDate> {
    let duration = parse_duration(offset)?;
    now.checked_add_signed(duration)
        .map(IntDate::new)
        .with_context(|| format!("Date {offset} from now is out of range"))
}

/// Build the claims set for `token mint`.
///
/// Flags override claims read from `--claims`. `iat` defaults to `now`.
pub fn build_claims(
    options: &MintOptions,
    default_lifetime: Option<&str>,
    now: DateTime<Utc>,
) -> anyhow::Result<ClaimsSet> {
    let mut claims = match &options.claims {
        Some(source) => {
            let text = read_input(source)?;
            let value = serde_json::from_str(&text).context("Claims input is not valid JSON")?;
            ClaimsSet::from_value(value).context("Claims input is not a valid claims set")?
        }
        None => ClaimsSet::empty(),
    };

    if let Some(issuer) = &options.issuer {
        claims.issuer = Some(StringOrUri::parse(issuer.as_str())?);
    }
    if let Some(subject) = &options.subject {
        claims.subject = Some(StringOrUri::parse(subject.as_str())?);
    }
    match options.audience.as_slice() {
        [] => {}
        [single] => claims.audience = Some(Audience::Special(StringOrUri::parse(single.as_str())?)),
        many => {
            let audiences = many
                .iter()
                .map(|aud| StringOrUri::parse(aud.as_str()))
                .collect::<Result<Vec<_>, _>>()?;
            claims.audience = Some(Audience::General(audiences));
        }
    }
    if let Some(expires) = options.expires.as_deref().or(default_lifetime) {
        claims.expiration = Some(offset_date(now, expires)?);
    }
    if let Some(not_before) = &options.not_before {
        claims.not_before = Some(offset_date(now, not_before)?);
    }
    if let Some(token_id) = &options.token_id {
        claims.token_id = Some(token_id.clone());
    }
    if claims.issued_at.is_none() {
        claims.issued_at = Some(IntDate::new(now));
    }

    Ok(claims)
}

/// Mint a new token.
pub fn mint(
    key: Option<String>,
    options: MintOptions,
    config: &SigningConfig,
) -> anyhow::Result<()> {
    let signing_key = resolve_signing_key(key, config)?;
    let claims = build_claims(&options, config.default_lifetime.as_deref(), Utc::now())?;
    let token = TokenBuilder::new(signing_key).issue(&claims)?;

    if let Some(output_path) = options.output {
        fs::write(&output_path, &token)?;
        eprintln!("✔ Token written to: {}", output_path.display());
        if let Some(sub) = &claims.subject {
            eprintln!("  Subject: {sub}");
        }
        if let Some(exp) = &claims.expiration {
            eprintln!("  Expires: {exp}");
        }
    } else {
        println!("{token}");
    }

    Ok(())
}

/// Verify a token and return its claims.
pub fn verify_token(
    token: &str,
    options: VerifyOptions,
    config: &VerifyConfig,
) -> anyhow::Result<ClaimsSet> {
    let store = resolve_key_store(options.keys, config)?;

    let audiences = if options.audiences.is_empty() {
        config.audiences.clone()
    } else {
        options.audiences
    };
    if audiences.is_empty() {
        debug!("no accepted audiences configured; tokens with an aud claim will be rejected");
    }
    let leeway_seconds = options.leeway.unwrap_or(config.leeway_seconds);
    let leeway = i64::try_from(leeway_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .with_context(|| format!("Leeway of {leeway_seconds}s is out of range"))?;

    let validation = Validation::for_audiences(audiences)
        .with_leeway(leeway)
        .require_audience(options.require_audience || config.require_audience)
        .require_key_id_match(options.require_kid_match || config.require_key_id_match);

    let verifier = TokenVerifier::new(store, validation);
    verifier
        .verify(token)
        .context("Token verification failed")
}

/// Verify a token and print its claims as JSON.
pub fn verify(token: String, options: VerifyOptions, config: &VerifyConfig) -> anyhow::Result<()> {
    let token_str = read_input(&token)?;
    let claims = verify_token(&token_str, options, config)?;
    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(())
}

/// Inspect a token without verification.
pub fn inspect(token: String) -> anyhow::Result<()> {
    let token_str = read_input(&token)?;
    let info = inspect_token_unverified(&token_str)?;

    let report = json!({
        "header": info.header,
        "payload": info.payload,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    eprintln!("⚠️  Signature NOT verified.");

    Ok(())
}
