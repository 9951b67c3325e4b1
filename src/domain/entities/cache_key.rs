//! Cache key derivation for source URLs.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Alphabet used for the base36 timestamp salt.
const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Unique identifier for a cached image file.
///
/// The key is `"{url digest}-{mint time}"`: a 16-hex-digit fold of the source
/// URL followed by the mint timestamp in base36 milliseconds. The digest makes
/// the key content-addressable; the salt makes every mint unique, so a
/// re-conversion of the same URL never overwrites the file a concurrent reader
/// may still be using.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Mints a fresh key for `url`, salted with the current time.
    #[must_use]
    pub fn derive(url: &str) -> Self {
        let millis = Utc::now().timestamp_millis().unsigned_abs();
        Self::derive_with_salt(url, millis)
    }

    /// Mints a key for `url` with an explicit millisecond salt.
    #[must_use]
    pub fn derive_with_salt(url: &str, salt_millis: u64) -> Self {
        Self(format!(
            "{:016x}-{}",
            fold_url(url),
            to_base36(salt_millis)
        ))
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Folds a URL into a fixed-width digest.
///
/// Multiplicative string hash over the raw bytes, wrapping on overflow. Not
/// cryptographic; it only needs to be deterministic across platforms and
/// cheap for URL-length inputs.
fn fold_url(url: &str) -> u64 {
    url.bytes()
        .fold(0u64, |hash, byte| hash.wrapping_mul(31).wrapping_add(u64::from(byte)))
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    // u64::MAX is 13 digits in base36
    let mut buf = [0u8; 13];
    let mut start = buf.len();
    while value > 0 {
        start -= 1;
        buf[start] = BASE36_DIGITS[(value % 36) as usize];
        value /= 36;
    }
    String::from_utf8_lossy(&buf[start..]).into_owned()
}
