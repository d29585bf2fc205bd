//! Token issuance and verification.

use crate::claims::{ClaimsSet, StringOrUri};
use crate::clock::{Clock, SystemClock};
use crate::codec::SignedToken;
use crate::error::{SigningError, VerifyError};
use crate::keys::SigningKey;
use crate::keystore::KeyResolver;
use crate::signer;
use chrono::Duration;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builder for issuing tokens.
pub struct TokenBuilder {
    key: SigningKey,
}

impl TokenBuilder {
    /// Create a new token builder with the given signing key.
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Sign a claims set and return its compact serialization.
    ///
    /// The header is derived from the key. Signing errors are returned as-is.
    pub fn issue(&self, claims: &ClaimsSet) -> Result<String, SigningError> {
        let header = self.key.header();
        let signed = signer::sign(&self.key, header, claims)?;
        debug!(alg = ?self.key.algorithm(), kid = ?self.key.kid(), "issued token");
        Ok(signed.encode_compact())
    }
}

type AudiencePredicate = dyn Fn(&StringOrUri) -> bool + Send + Sync;

/// Settings for the claim checks that follow signature verification.
#[derive(Clone)]
pub struct Validation {
    audience: Arc<AudiencePredicate>,
    leeway: Duration,
    clock: Arc<dyn Clock>,
    require_audience: bool,
    require_key_id_match: bool,
}

impl Validation {
    /// Validation accepting audiences for which `audience` returns true.
    ///
    /// Defaults: zero leeway, the system clock, tokens without `aud` pass,
    /// and every candidate key is tried regardless of `kid`.
    pub fn new(audience: impl Fn(&StringOrUri) -> bool + Send + Sync + 'static) -> Self {
        Self {
            audience: Arc::new(audience),
            leeway: Duration::zero(),
            clock: Arc::new(SystemClock),
            require_audience: false,
            require_key_id_match: false,
        }
    }

    /// Validation accepting audiences whose text is in `accepted`.
    pub fn for_audiences<I, S>(accepted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accepted: Vec<String> = accepted.into_iter().map(Into::into).collect();
        Self::new(move |aud| accepted.iter().any(|a| a == aud.as_str()))
    }

    /// Allowed clock skew for `exp` and `nbf`. Negative values count as zero.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway.max(Duration::zero());
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Reject tokens without an `aud` claim.
    pub fn require_audience(mut self, require: bool) -> Self {
        self.require_audience = require;
        self
    }

    /// Only try keys whose `kid` equals the token's `kid`, when it has one.
    pub fn require_key_id_match(mut self, require: bool) -> Self {
        self.require_key_id_match = require;
        self
    }

    /// Apply the temporal and audience checks to a decoded claims set.
    pub fn validate_claims(&self, claims: &ClaimsSet) -> Result<(), VerifyError> {
        let now = self.clock.now();

        if let Some(expiration) = claims.expiration {
            let expired = expiration
                .as_datetime()
                .checked_add_signed(self.leeway)
                .is_some_and(|limit| now >= limit);
            if expired {
                return Err(VerifyError::TokenExpired {
                    expired_at: expiration.to_string(),
                });
            }
        }

        if let Some(not_before) = claims.not_before {
            let early = not_before
                .as_datetime()
                .checked_sub_signed(self.leeway)
                .is_some_and(|start| now < start);
            if early {
                return Err(VerifyError::TokenNotYetValid {
                    not_before: not_before.to_string(),
                });
            }
        }

        match &claims.audience {
            Some(audience) if !audience.any(|aud| (self.audience)(aud)) => {
                Err(VerifyError::AudienceRejected)
            }
            None if self.require_audience => Err(VerifyError::AudienceRequired),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validation")
            .field("leeway", &self.leeway)
            .field("require_audience", &self.require_audience)
            .field("require_key_id_match", &self.require_key_id_match)
            .finish_non_exhaustive()
    }
}

/// Verifier for tokens against a key store.
#[derive(Debug)]
pub struct TokenVerifier<S> {
    store: S,
    validation: Validation,
}

impl<S: KeyResolver> TokenVerifier<S> {
    /// Create a new token verifier over the given key store.
    pub fn new(store: S, validation: Validation) -> Self {
        Self { store, validation }
    }

    pub fn validation(&self) -> &Validation {
        &self.validation
    }

    /// Verify a token and return its validated claims.
    ///
    /// Candidate keys are tried in store order until one verifies. If none
    /// does, the result is [`VerifyError::SignatureInvalid`] without saying
    /// which keys were tried.
    pub fn verify(&self, token: &str) -> Result<ClaimsSet, VerifyError> {
        let signed = SignedToken::decode_compact(token)?;
        let kid = signed.header().kid.as_deref();
        let candidates = self.store.resolve(kid)?;

        let verified = candidates
            .iter()
            .filter(|key| {
                !self.validation.require_key_id_match || kid.is_none() || key.kid() == kid
            })
            .any(|key| match signer::verify(key, &signed) {
                Ok(valid) => valid,
                Err(e) => {
                    debug!(error = %e, "candidate key failed to verify");
                    false
                }
            });
        if !verified {
            return Err(VerifyError::SignatureInvalid);
        }

        let claims = ClaimsSet::from_slice(signed.payload())?;
        self.validation.validate_claims(&claims)?;
        Ok(claims)
    }
}
