use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;
use tracing::trace;

/// Digit alphabet, indexed by digit value.
///
/// Tokens already handed out depend on this exact order.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: i64 = 62;

/// Encodes a positive integer as base-62, least-significant digit first.
///
/// The digits are emitted in the order they are produced and never
/// reversed, so `encode(62)` is `"01"`.
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] for zero and negative numbers.
pub fn encode(n: i64) -> Result<ShortToken> {
    if n <= 0 {
        return Err(CoreError::InvalidArgument(format!(
            "cannot encode non-positive number {n}"
        )));
    }

    // i64::MAX needs 11 digits
    let mut digits = String::with_capacity(11);
    let mut rest = n;
    while rest > 0 {
        digits.push(char::from(ALPHABET[(rest % BASE) as usize]));
        rest /= BASE;
    }

    trace!(number = n, token = %digits, "encoded number as base62");
    Ok(ShortToken(SmolStr::new(digits)))
}

/// A short token made of base-62 alphabet characters.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShortToken(SmolStr);

impl ShortToken {
    /// Encodes an allocator id.
    ///
    /// Ids above `i64::MAX` cannot come out of the allocator and are rejected
    /// like zero.
    pub fn from_id(id: u64) -> Result<Self> {
        let n = i64::try_from(id).map_err(|_| {
            CoreError::InvalidArgument(format!("id {id} does not fit a signed 64-bit integer"))
        })?;
        encode(n)
    }

    /// Wraps a string after checking that it only uses alphabet characters.
    pub fn parse(token: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(CoreError::InvalidArgument("empty token".to_string()));
        }
        if let Some(c) = token.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidArgument(format!(
                "character '{c}' is not in the base62 alphabet: '{token}'"
            )));
        }
        Ok(Self(SmolStr::new(token)))
    }

    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }
}

impl std::fmt::Debug for ShortToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortToken").field(&self.0).finish()
    }
}

impl Display for ShortToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortToken {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for ShortToken {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortToken {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = SmolStr::deserialize(deserializer)?;
        ShortToken::parse(&s).map_err(serde::de::Error::custom)
    }
}
