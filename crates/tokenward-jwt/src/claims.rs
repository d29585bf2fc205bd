//! The JWT claims set and its registered claim types.
//!
//! A [`ClaimsSet`] maps the seven registered claims (`iss`, `sub`, `aud`,
//! `exp`, `nbf`, `iat`, `jti`) onto typed fields and keeps every other member
//! of the payload object verbatim as an extension claim.
//!
//! Registered names are reserved: they are stripped out of the extension bag
//! on decode, and encode always emits them from their typed fields.

use crate::error::ClaimsError;
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::{self, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Registered claim names.
pub const ISSUER: &str = "iss";
pub const SUBJECT: &str = "sub";
pub const AUDIENCE: &str = "aud";
pub const EXPIRATION: &str = "exp";
pub const NOT_BEFORE: &str = "nbf";
pub const ISSUED_AT: &str = "iat";
pub const TOKEN_ID: &str = "jti";

/// All registered claim names, reserved from the extension bag.
pub const REGISTERED_CLAIMS: [&str; 7] = [
    ISSUER, SUBJECT, AUDIENCE, EXPIRATION, NOT_BEFORE, ISSUED_AT, TOKEN_ID,
];

/// Check whether a claim name is one of the registered claims.
pub fn is_registered(name: &str) -> bool {
    REGISTERED_CLAIMS.contains(&name)
}

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// A URI kept exactly as written.
///
/// The text is validated as a URI but never normalized, so it serializes
/// back byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri(String);

impl Uri {
    /// Validate `text` as a URI.
    ///
    /// The text must use only RFC 3986 characters, with well-formed
    /// percent-encodings, and must also parse as a URL.
    pub fn parse(text: impl Into<String>) -> Result<Self, ClaimsError> {
        let text = text.into();
        let checked = check_rfc3986(&text).and_then(|()| {
            Url::parse(&text)
                .map(drop)
                .map_err(|e| e.to_string())
        });
        match checked {
            Ok(()) => Ok(Self(text)),
            Err(reason) => Err(ClaimsError::InvalidUri {
                value: text,
                reason,
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check the scheme and character set of an RFC 3986 URI.
fn check_rfc3986(text: &str) -> Result<(), String> {
    let (scheme, _) = text
        .split_once(':')
        .ok_or_else(|| "missing scheme".to_string())?;
    let mut scheme_chars = scheme.chars();
    let scheme_ok = scheme_chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && scheme_chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err(format!("invalid scheme '{scheme}'"));
    }

    let bytes = text.as_bytes();
    let mut at = 0;
    while at < bytes.len() {
        match bytes[at] {
            b'%' => {
                let escape = bytes.get(at + 1..at + 3);
                if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                    return Err(format!("malformed percent-encoding at byte {at}"));
                }
                at += 3;
            }
            b if b.is_ascii_alphanumeric() || b"-._~:/?#[]@!$&'()*+,;=".contains(&b) => at += 1,
            _ => {
                let c = text[at..].chars().next().unwrap_or_default();
                return Err(format!("character {c:?} is not allowed in a URI"));
            }
        }
    }
    Ok(())
}

/// A case-sensitive string or a URI.
///
/// Any value containing `:` must be a valid URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StringOrUri {
    String(String),
    Uri(Uri),
}

impl StringOrUri {
    /// Parse text, treating it as a URI when it contains a colon.
    pub fn parse(text: impl Into<String>) -> Result<Self, ClaimsError> {
        let text = text.into();
        if text.contains(':') {
            Uri::parse(text).map(Self::Uri)
        } else {
            Ok(Self::String(text))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::String(s) => s,
            Self::Uri(uri) => uri.as_str(),
        }
    }

    fn from_value(claim: &'static str, value: Value) -> Result<Self, ClaimsError> {
        match value {
            Value::String(text) => Self::parse(text),
            other => Err(ClaimsError::InvalidClaim {
                claim,
                reason: format!("expected a string, found {}", kind(&other)),
            }),
        }
    }
}

impl FromStr for StringOrUri {
    type Err = ClaimsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StringOrUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StringOrUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StringOrUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(text).map_err(de::Error::custom)
    }
}

/// A point in time, encoded as seconds since the Unix epoch.
///
/// Fractional seconds are carried exactly: the wire number is converted as
/// decimal text, never through `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntDate(DateTime<Utc>);

impl IntDate {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Build from whole seconds and a nanosecond part.
    pub fn from_timestamp(seconds: i64, nanos: u32) -> Option<Self> {
        DateTime::from_timestamp(seconds, nanos).map(Self)
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Exact decimal rendering, e.g. `1700000000` or `1700000000.5`.
    pub fn to_decimal(&self) -> String {
        let seconds = self.0.timestamp();
        let nanos = self.0.timestamp_subsec_nanos();
        if nanos == 0 {
            return seconds.to_string();
        }

        let total = i128::from(seconds) * NANOS_PER_SECOND + i128::from(nanos);
        let sign = if total < 0 { "-" } else { "" };
        let magnitude = total.unsigned_abs();
        let whole = magnitude / NANOS_PER_SECOND as u128;
        let fraction = format!("{:09}", magnitude % NANOS_PER_SECOND as u128);
        format!("{sign}{whole}.{}", fraction.trim_end_matches('0'))
    }

    /// Parse a JSON number literal without going through floating point.
    pub fn from_decimal(text: &str) -> Option<Self> {
        let total = decimal_to_nanos(text)?;
        let seconds = i64::try_from(total.div_euclid(NANOS_PER_SECOND)).ok()?;
        let nanos = u32::try_from(total.rem_euclid(NANOS_PER_SECOND)).ok()?;
        Self::from_timestamp(seconds, nanos)
    }

    fn from_value(claim: &'static str, value: Value) -> Result<Self, ClaimsError> {
        match value {
            Value::Number(number) => {
                let text = number.to_string();
                Self::from_decimal(&text).ok_or_else(|| ClaimsError::InvalidClaim {
                    claim,
                    reason: format!("{text} is not a representable date"),
                })
            }
            other => Err(ClaimsError::InvalidClaim {
                claim,
                reason: format!("expected a number, found {}", kind(&other)),
            }),
        }
    }
}

impl From<DateTime<Utc>> for IntDate {
    fn from(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl fmt::Display for IntDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for IntDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let number: Number = self.to_decimal().parse().map_err(ser::Error::custom)?;
        number.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IntDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = Number::deserialize(deserializer)?.to_string();
        Self::from_decimal(&text)
            .ok_or_else(|| de::Error::custom(format!("{text} is not a representable date")))
    }
}

/// Convert a JSON number literal to nanoseconds, truncating below 1ns.
fn decimal_to_nanos(text: &str) -> Option<i128> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (mantissa, exponent) = match unsigned.find(|c: char| c == 'e' || c == 'E') {
        Some(at) => (&unsigned[..at], unsigned[at + 1..].parse::<i32>().ok()?),
        None => (unsigned, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty()
        || !whole.bytes().all(|b| b.is_ascii_digit())
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let fraction_len = i32::try_from(fraction.len()).ok()?;
    let shift = 9i32.checked_add(exponent)?.checked_sub(fraction_len)?;

    // Digits below one nanosecond are dropped before parsing.
    let mut digits = format!("{whole}{fraction}");
    if shift < 0 {
        let dropped = usize::try_from(shift.unsigned_abs()).ok()?;
        digits.truncate(digits.len().saturating_sub(dropped));
    }
    let digits = digits.trim_start_matches('0');
    let mut value: i128 = if digits.is_empty() { 0 } else { digits.parse().ok()? };
    if shift > 0 {
        value = value.checked_mul(10i128.checked_pow(shift.unsigned_abs())?)?;
    }
    Some(if negative { -value } else { value })
}

/// The intended recipients of a token.
///
/// A bare string and a one-element array are kept apart: they decode to
/// different variants and do not compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// A single audience, encoded as a string.
    Special(StringOrUri),
    /// A non-empty list of audiences, encoded as an array.
    General(Vec<StringOrUri>),
}

impl Audience {
    /// Every audience value, in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StringOrUri> {
        match self {
            Self::Special(single) => std::slice::from_ref(single).iter(),
            Self::General(many) => many.iter(),
        }
    }

    /// Check whether `accept` holds for at least one audience value.
    pub fn any(&self, accept: impl Fn(&StringOrUri) -> bool) -> bool {
        self.iter().any(accept)
    }

    fn from_value(value: Value) -> Result<Self, ClaimsError> {
        match value {
            Value::String(_) => StringOrUri::from_value(AUDIENCE, value).map(Self::Special),
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(ClaimsError::InvalidClaim {
                        claim: AUDIENCE,
                        reason: "audience list is empty".to_string(),
                    });
                }
                items
                    .into_iter()
                    .map(|item| StringOrUri::from_value(AUDIENCE, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::General)
            }
            other => Err(ClaimsError::InvalidClaim {
                claim: AUDIENCE,
                reason: format!("expected a string or an array, found {}", kind(&other)),
            }),
        }
    }
}

impl From<StringOrUri> for Audience {
    fn from(single: StringOrUri) -> Self {
        Self::Special(single)
    }
}

impl Serialize for Audience {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Special(single) => single.serialize(serializer),
            Self::General(many) => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

/// The payload of a token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimsSet {
    /// Who issued the token.
    pub issuer: Option<StringOrUri>,

    /// The principal the token is about.
    pub subject: Option<StringOrUri>,

    /// Intended recipient(s).
    pub audience: Option<Audience>,

    /// Token is invalid at or after this instant.
    pub expiration: Option<IntDate>,

    /// Token is invalid before this instant.
    pub not_before: Option<IntDate>,

    /// When the token was issued.
    pub issued_at: Option<IntDate>,

    /// Opaque, case-sensitive token identifier.
    pub token_id: Option<String>,

    /// Every non-registered claim. Never holds a registered name.
    extensions: Map<String, Value>,
}

impl ClaimsSet {
    /// A claims set with no claims.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode a claims set from a JSON value.
    ///
    /// A registered claim set to `null` is treated as absent.
    pub fn from_value(value: Value) -> Result<Self, ClaimsError> {
        let Value::Object(mut object) = value else {
            return Err(ClaimsError::NotAnObject);
        };

        let issuer = take(&mut object, ISSUER, StringOrUri::from_value)?;
        let subject = take(&mut object, SUBJECT, StringOrUri::from_value)?;
        let audience = take(&mut object, AUDIENCE, |_, v| Audience::from_value(v))?;
        let expiration = take(&mut object, EXPIRATION, IntDate::from_value)?;
        let not_before = take(&mut object, NOT_BEFORE, IntDate::from_value)?;
        let issued_at = take(&mut object, ISSUED_AT, IntDate::from_value)?;
        let token_id = take(&mut object, TOKEN_ID, |claim, v| match v {
            Value::String(s) => Ok(s),
            other => Err(ClaimsError::InvalidClaim {
                claim,
                reason: format!("expected a string, found {}", kind(&other)),
            }),
        })?;

        Ok(Self {
            issuer,
            subject,
            audience,
            expiration,
            not_before,
            issued_at,
            token_id,
            extensions: object,
        })
    }

    /// Decode a claims set from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ClaimsError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Encode the claims set as a JSON object.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn with_issuer(mut self, issuer: StringOrUri) -> Self {
        self.issuer = Some(issuer);
        self
    }

    pub fn with_subject(mut self, subject: StringOrUri) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = Some(audience);
        self
    }

    pub fn with_expiration(mut self, expiration: IntDate) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn with_not_before(mut self, not_before: IntDate) -> Self {
        self.not_before = Some(not_before);
        self
    }

    pub fn with_issued_at(mut self, issued_at: IntDate) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    pub fn with_token_id(mut self, token_id: impl Into<String>) -> Self {
        self.token_id = Some(token_id.into());
        self
    }

    /// Add an extension claim. Registered names are refused.
    pub fn with_extension(
        mut self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<Self, ClaimsError> {
        let name = name.into();
        if is_registered(&name) {
            return Err(ClaimsError::ReservedClaim(name));
        }
        self.extensions.insert(name, value);
        Ok(self)
    }

    /// Look up an extension claim.
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.extensions.get(name)
    }

    /// All extension claims.
    pub fn extensions(&self) -> &Map<String, Value> {
        &self.extensions
    }
}

impl Serialize for ClaimsSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(issuer) = &self.issuer {
            map.serialize_entry(ISSUER, issuer)?;
        }
        if let Some(subject) = &self.subject {
            map.serialize_entry(SUBJECT, subject)?;
        }
        if let Some(audience) = &self.audience {
            map.serialize_entry(AUDIENCE, audience)?;
        }
        if let Some(expiration) = &self.expiration {
            map.serialize_entry(EXPIRATION, expiration)?;
        }
        if let Some(not_before) = &self.not_before {
            map.serialize_entry(NOT_BEFORE, not_before)?;
        }
        if let Some(issued_at) = &self.issued_at {
            map.serialize_entry(ISSUED_AT, issued_at)?;
        }
        if let Some(token_id) = &self.token_id {
            map.serialize_entry(TOKEN_ID, token_id)?;
        }
        for (name, value) in self.extensions.iter().filter(|(name, _)| !is_registered(name)) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ClaimsSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

fn take<T>(
    object: &mut Map<String, Value>,
    claim: &'static str,
    decode: impl FnOnce(&'static str, Value) -> Result<T, ClaimsError>,
) -> Result<Option<T>, ClaimsError> {
    match object.remove(claim) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => decode(claim, value).map(Some),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
