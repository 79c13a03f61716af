//! Phone number normalization and validation
//!
//! Converts raw operator input into the canonical dialable form: country
//! calling code followed by the subscriber number, no symbols. Normalization
//! and validation are pure functions; malformed input is never an error, it
//! just validates false.

use serde::{Deserialize, Serialize};

use crate::config::NumberFormatConfig;

/// Normalizer for a single national numbering plan
///
/// Built from [`NumberFormatConfig`]. The trunk-prefix rewrite (leading `0`
/// of a trunk-prefixed local number becomes the country code) is
/// deployment-specific and therefore an explicit option rather than a
/// built-in rule; see [`NumberFormatConfig::rewrite_trunk_prefix`].
#[derive(Clone, Debug)]
pub struct NumberFormat {
    country_code: String,
    subscriber_len: usize,
    rewrite_trunk_prefix: bool,
}

impl NumberFormat {
    /// Build a normalizer from configuration
    pub fn new(config: &NumberFormatConfig) -> Self {
        Self {
            country_code: config.country_code.clone(),
            subscriber_len: config.subscriber_len,
            rewrite_trunk_prefix: config.rewrite_trunk_prefix,
        }
    }

    /// Expected length of a canonical number (country code + subscriber digits)
    pub fn international_len(&self) -> usize {
        self.country_code.len() + self.subscriber_len
    }

    /// Convert a raw number to its canonical dialable form
    ///
    /// Strips whitespace and a leading `+`, optionally rewrites a national
    /// trunk prefix, and qualifies a bare subscriber number with the country
    /// code. Input that matches none of the recognized shapes is returned
    /// as-is (it will fail [`is_valid`](Self::is_valid) anyway).
    pub fn normalize(&self, raw: &str) -> String {
        let mut num: String = raw.trim().split_whitespace().collect();
        if let Some(stripped) = num.strip_prefix('+') {
            num = stripped.to_string();
        }

        if self.rewrite_trunk_prefix
            && num.starts_with('0')
            && num.len() == self.subscriber_len + 1
        {
            num = format!("{}{}", self.country_code, &num[1..]);
        }

        if num.starts_with(&self.country_code) && num.len() == self.international_len() {
            return num;
        }

        if num.len() == self.subscriber_len {
            return format!("{}{}", self.country_code, num);
        }

        num
    }

    /// Check whether a raw number is dialable
    ///
    /// Strips a leading `+`, one occurrence of the country code, and one
    /// leading trunk-prefix `0`; the remainder must be all digits and at
    /// least the subscriber length. Never panics.
    pub fn is_valid(&self, raw: &str) -> bool {
        let num: String = raw.trim().split_whitespace().collect();
        let s = num.trim_start_matches('+');
        let s = s.strip_prefix(self.country_code.as_str()).unwrap_or(s);
        let s = s.strip_prefix('0').unwrap_or(s);
        !s.is_empty() && s.len() >= self.subscriber_len && s.chars().all(|c| c.is_ascii_digit())
    }
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self::new(&NumberFormatConfig::default())
    }
}

/// A phone number as seen by one dispatch attempt
///
/// Immutable once constructed; created per attempt, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    /// Operator input exactly as read from the source list
    pub raw: String,
    /// Normalized dialable form (country code + subscriber number)
    pub canonical: String,
    /// Whether the raw input passed validation
    pub valid: bool,
}

impl PhoneNumber {
    /// Normalize and validate a raw number
    pub fn parse(raw: &str, format: &NumberFormat) -> Self {
        Self {
            raw: raw.to_string(),
            canonical: format.normalize(raw),
            valid: format.is_valid(raw),
        }
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical)
    }
}
