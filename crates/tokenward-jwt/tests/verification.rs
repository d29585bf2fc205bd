//! End-to-end issuance and verification tests.
//!
//! Run with: cargo test --package tokenward-jwt --test verification

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;
use tokenward_jwt::{
    Algorithm, Audience, ClaimsSet, FixedClock, IntDate, KeyFile, KeyStore, KeyStoreError,
    SigningKey, StringOrUri, TokenBuilder, TokenVerifier, Validation, VerifyError,
};

const NOW: i64 = 1_700_000_000;

fn clock() -> FixedClock {
    FixedClock(IntDate::from_timestamp(NOW, 0).unwrap().as_datetime())
}

fn accept_all() -> Validation {
    Validation::new(|_| true).with_clock(clock())
}

fn key_file(kid: &str) -> KeyFile {
    KeyFile::generate_hmac(Algorithm::HS256, Some(kid.to_string())).unwrap()
}

fn write_keys(dir: &Path, kids: &[&str]) -> Vec<KeyFile> {
    kids.iter()
        .map(|kid| {
            let file = key_file(kid);
            file.save_to_file(&dir.join(format!("{kid}.json"))).unwrap();
            file
        })
        .collect()
}

fn issue(key: &SigningKey, claims: &ClaimsSet) -> String {
    TokenBuilder::new(key.clone()).issue(claims).unwrap()
}

fn sou(text: &str) -> StringOrUri {
    StringOrUri::parse(text).unwrap()
}

#[test]
fn test_issue_and_verify_single_key() {
    let file = key_file("main");
    let claims = ClaimsSet::empty()
        .with_issuer(sou("https://issuer.example"))
        .with_subject(sou("alice"))
        .with_audience(Audience::Special(sou("api")))
        .with_expiration(IntDate::from_timestamp(NOW + 3600, 0).unwrap())
        .with_issued_at(IntDate::from_timestamp(NOW, 0).unwrap())
        .with_extension("scope", json!(["read", "write"]))
        .unwrap();

    let token = issue(&file.signing_key().unwrap(), &claims);
    assert_eq!(token.split('.').count(), 3);

    let verifier = TokenVerifier::new(
        KeyStore::Single(file.verification_key().unwrap()),
        Validation::for_audiences(["api"]).with_clock(clock()),
    );
    let verified = verifier.verify(&token).unwrap();
    assert_eq!(verified, claims);
}

#[test]
fn test_directory_store_finds_signing_key() {
    let dir = tempdir().unwrap();
    let files = write_keys(dir.path(), &["k1", "k2", "k3"]);

    let token = issue(&files[1].signing_key().unwrap(), &ClaimsSet::empty());
    let verifier = TokenVerifier::new(KeyStore::open(dir.path()).unwrap(), accept_all());
    assert!(verifier.verify(&token).is_ok());
}

#[test]
fn test_directory_store_tries_every_key_without_kid() {
    let dir = tempdir().unwrap();
    write_keys(dir.path(), &["k1", "k2"]);

    let mut anonymous = key_file("unused");
    anonymous.kid = None;
    anonymous.save_to_file(&dir.path().join("anonymous.json")).unwrap();

    let token = issue(&anonymous.signing_key().unwrap(), &ClaimsSet::empty());
    let verifier = TokenVerifier::new(KeyStore::open(dir.path()).unwrap(), accept_all());
    assert!(verifier.verify(&token).is_ok());
}

#[test]
fn test_unknown_key_is_signature_invalid() {
    let dir = tempdir().unwrap();
    write_keys(dir.path(), &["k1", "k2", "k3"]);

    let outsider = key_file("k2");
    let token = issue(&outsider.signing_key().unwrap(), &ClaimsSet::empty());

    let verifier = TokenVerifier::new(KeyStore::open(dir.path()).unwrap(), accept_all());
    assert!(matches!(
        verifier.verify(&token),
        Err(VerifyError::SignatureInvalid)
    ));

    let stranger = key_file("nobody");
    let token = issue(&stranger.signing_key().unwrap(), &ClaimsSet::empty());
    assert!(matches!(
        verifier.verify(&token),
        Err(VerifyError::SignatureInvalid)
    ));
}

#[test]
fn test_signature_checked_before_expiration() {
    let claims =
        ClaimsSet::empty().with_expiration(IntDate::from_timestamp(NOW - 60, 0).unwrap());
    let signer = key_file("a");
    let token = issue(&signer.signing_key().unwrap(), &claims);

    let other = key_file("a");
    let verifier = TokenVerifier::new(
        KeyStore::Single(other.verification_key().unwrap()),
        accept_all(),
    );
    assert!(matches!(
        verifier.verify(&token),
        Err(VerifyError::SignatureInvalid)
    ));

    let verifier = TokenVerifier::new(
        KeyStore::Single(signer.verification_key().unwrap()),
        accept_all(),
    );
    assert!(matches!(
        verifier.verify(&token),
        Err(VerifyError::TokenExpired { .. })
    ));
}

#[test]
fn test_tampered_payload_is_signature_invalid() {
    let file = key_file("main");
    let token = issue(&file.signing_key().unwrap(), &ClaimsSet::empty());

    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    parts[1] = URL_SAFE_NO_PAD.encode(br#"{"sub":"mallory"}"#);
    let forged = parts.join(".");

    let verifier = TokenVerifier::new(
        KeyStore::Single(file.verification_key().unwrap()),
        accept_all(),
    );
    assert!(matches!(
        verifier.verify(&forged),
        Err(VerifyError::SignatureInvalid)
    ));
}

#[test]
fn test_malformed_token_is_format_error() {
    let file = key_file("main");
    let verifier = TokenVerifier::new(
        KeyStore::Single(file.verification_key().unwrap()),
        accept_all(),
    );
    for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
        assert!(
            matches!(verifier.verify(token), Err(VerifyError::TokenFormat(_))),
            "{token}"
        );
    }
}

#[test]
fn test_signed_bad_claims_is_claims_decode_error() {
    let file = key_file("main");
    let key = file.signing_key().unwrap();

    // Sign a payload whose `exp` is a string, bypassing ClaimsSet.
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&key.header()).unwrap());
    let payload = URL_SAFE_NO_PAD.encode(br#"{"exp":"tomorrow"}"#);
    let signing_input = format!("{header}.{payload}");
    let encoding = jsonwebtoken::EncodingKey::from_secret(
        &URL_SAFE_NO_PAD
            .decode(file.secret.as_deref().unwrap())
            .unwrap(),
    );
    let signature =
        jsonwebtoken::crypto::sign(signing_input.as_bytes(), &encoding, Algorithm::HS256)
            .unwrap();
    let token = format!("{signing_input}.{signature}");

    let verifier = TokenVerifier::new(
        KeyStore::Single(file.verification_key().unwrap()),
        accept_all(),
    );
    assert!(matches!(
        verifier.verify(&token),
        Err(VerifyError::ClaimsDecode(_))
    ));
}

#[test]
fn test_audience_rejected_after_signature() {
    let file = key_file("main");
    let claims = ClaimsSet::empty().with_audience(Audience::General(vec![sou("billing")]));
    let token = issue(&file.signing_key().unwrap(), &claims);

    let verifier = TokenVerifier::new(
        KeyStore::Single(file.verification_key().unwrap()),
        Validation::for_audiences(["search"]).with_clock(clock()),
    );
    assert!(matches!(
        verifier.verify(&token),
        Err(VerifyError::AudienceRejected)
    ));
}

#[test]
fn test_require_key_id_match() {
    let dir = tempdir().unwrap();
    let files = write_keys(dir.path(), &["k1"]);

    // Same secret, different kid: permissive mode accepts it.
    let mut renamed = files[0].clone();
    renamed.kid = Some("k9".to_string());
    let token = issue(&renamed.signing_key().unwrap(), &ClaimsSet::empty());

    let permissive = TokenVerifier::new(KeyStore::open(dir.path()).unwrap(), accept_all());
    assert!(permissive.verify(&token).is_ok());

    let strict = TokenVerifier::new(
        KeyStore::open(dir.path()).unwrap(),
        accept_all().require_key_id_match(true),
    );
    assert!(matches!(
        strict.verify(&token),
        Err(VerifyError::SignatureInvalid)
    ));
}

#[test]
fn test_algorithm_mismatch_never_verifies() {
    let file = key_file("main");
    let mut hs512 = file.clone();
    hs512.alg = Algorithm::HS512;

    let token = issue(&hs512.signing_key().unwrap(), &ClaimsSet::empty());
    let verifier = TokenVerifier::new(
        KeyStore::Single(file.verification_key().unwrap()),
        accept_all(),
    );
    assert!(matches!(
        verifier.verify(&token),
        Err(VerifyError::SignatureInvalid)
    ));
}

#[test]
fn test_empty_key_directory_is_key_store_error() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("README"), "keys go here").unwrap();

    let file = key_file("main");
    let token = issue(&file.signing_key().unwrap(), &ClaimsSet::empty());

    let verifier = TokenVerifier::new(KeyStore::open(dir.path()).unwrap(), accept_all());
    assert!(matches!(
        verifier.verify(&token),
        Err(VerifyError::KeyStore(KeyStoreError::NoUsableKeys(_)))
    ));
}

#[test]
fn test_concurrent_verification_shares_store() {
    let dir = tempdir().unwrap();
    let files = write_keys(dir.path(), &["k1", "k2", "k3"]);
    let tokens: Vec<String> = files
        .iter()
        .map(|file| issue(&file.signing_key().unwrap(), &ClaimsSet::empty()))
        .collect();

    let verifier = TokenVerifier::new(KeyStore::open(dir.path()).unwrap(), accept_all());
    std::thread::scope(|scope| {
        for token in &tokens {
            let verifier = &verifier;
            scope.spawn(move || {
                for _ in 0..10 {
                    assert!(verifier.verify(token).is_ok());
                }
            });
        }
    });
}
