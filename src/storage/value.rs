//! Native record values and their plain-JSON rendering.
//!
//! Everything the store hands back is decoded into [`RecordValue`] before it
//! leaves the storage layer. [`format_record`] then turns a record into the
//! JSON a caller sees.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A single stored item: attribute name to value.
pub type Record = BTreeMap<String, RecordValue>;

/// Number text that did not parse as a finite decimal.
#[derive(Debug, Clone, Error)]
#[error("invalid number: {0:?}")]
pub struct InvalidDecimal(pub String);

/// Arbitrary-precision decimal as returned by the store.
///
/// The store allows 38 significant digits and exponents far outside what
/// fixed-width decimal types hold, so the validated text is kept as-is and
/// narrowed on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal(String);

impl Decimal {
    /// Narrows to `f64`, accepting precision loss.
    pub fn to_f64(&self) -> f64 {
        // validated on construction
        self.0.parse().unwrap_or_default()
    }

    /// Exact integer value, if integral and in range.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Decimal {
    type Err = InvalidDecimal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let well_formed = !text.is_empty()
            && text.bytes().any(|b| b.is_ascii_digit())
            && text
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'));

        match text.parse::<f64>() {
            Ok(n) if well_formed && n.is_finite() => Ok(Self(text.to_string())),
            _ => Err(InvalidDecimal(s.to_string())),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded store value.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    String(String),
    Number(Decimal),
    Bool(bool),
    Null,
    Binary(Vec<u8>),
    StringSet(Vec<String>),
    NumberSet(Vec<Decimal>),
    BinarySet(Vec<Vec<u8>>),
    List(Vec<RecordValue>),
    Map(Record),
}

impl RecordValue {
    /// Converts to plain JSON, recursing through lists and maps.
    pub fn to_json(&self) -> Value {
        match self {
            RecordValue::String(s) => Value::String(s.clone()),
            RecordValue::Number(n) => number_to_json(n),
            RecordValue::Bool(b) => Value::Bool(*b),
            RecordValue::Null => Value::Null,
            RecordValue::Binary(bytes) => Value::String(STANDARD.encode(bytes)),
            RecordValue::StringSet(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
            RecordValue::NumberSet(items) => Value::Array(items.iter().map(number_to_json).collect()),
            RecordValue::BinarySet(items) => Value::Array(
                items
                    .iter()
                    .map(|bytes| Value::String(STANDARD.encode(bytes)))
                    .collect(),
            ),
            RecordValue::List(items) => Value::Array(items.iter().map(RecordValue::to_json).collect()),
            RecordValue::Map(record) => format_record(record),
        }
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            RecordValue::Number(n) => Some(n),
            _ => None,
        }
    }
}

/// Integral numbers stay JSON integers; everything else becomes a float.
fn number_to_json(n: &Decimal) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::from(i);
    }
    if let Some(u) = n.as_u64() {
        return Value::from(u);
    }
    Number::from_f64(n.to_f64())
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Formats a record as a plain JSON object.
pub fn format_record(record: &Record) -> Value {
    let object: Map<String, Value> = record
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();
    Value::Object(object)
}
