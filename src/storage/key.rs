//! Integer table keys of unbounded size.
//!
//! The store accepts number keys of up to 38 digits, well past `i64`, so a
//! key is held as canonical decimal digits and ordered numerically.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("invalid integer literal: {0:?}")]
pub struct InvalidBookKey(pub String);

/// Canonical integer key: no leading zeros, no sign on zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookKey {
    negative: bool,
    digits: String,
}

impl BookKey {
    fn from_parts(negative: bool, digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            Self {
                negative: false,
                digits: "0".to_string(),
            }
        } else {
            Self {
                negative,
                digits: trimmed.to_string(),
            }
        }
    }
}

impl FromStr for BookKey {
    type Err = InvalidBookKey;

    /// Accepts integer literal syntax: surrounding whitespace, an optional
    /// sign, and digits with single underscores between them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidBookKey(s.to_string());
        let text = s.trim();

        let (negative, body) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        if body.is_empty() || body.starts_with('_') || body.ends_with('_') || body.contains("__")
        {
            return Err(invalid());
        }

        let mut digits = String::with_capacity(body.len());
        for c in body.chars() {
            match c {
                '0'..='9' => digits.push(c),
                '_' => {}
                _ => return Err(invalid()),
            }
        }

        Ok(Self::from_parts(negative, &digits))
    }
}

impl From<i64> for BookKey {
    fn from(n: i64) -> Self {
        Self::from_parts(n < 0, &n.unsigned_abs().to_string())
    }
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str(&self.digits)
    }
}

impl Ord for BookKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let magnitude = self
            .digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.cmp(&other.digits));

        match (self.negative, other.negative) {
            (false, false) => magnitude,
            (true, true) => magnitude.reverse(),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        }
    }
}

impl PartialOrd for BookKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
