//! Decoding of items at the store boundary.
//!
//! Two JSON shapes are accepted: the store's tagged wire form
//! (`{"price": {"N": "19.99"}}`, as produced by DynamoDB exports and the
//! low-level API) and plain JSON (`{"price": 19.99}`). Both decode into
//! [`Record`]; the tagged form never travels further.

use super::value::{Decimal, InvalidDecimal, Record, RecordValue};
use super::StoreError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Tagged wire representation of a single attribute.
#[derive(Debug, Deserialize)]
enum TaggedValue {
    #[serde(rename = "S")]
    String(String),
    #[serde(rename = "N")]
    Number(String),
    #[serde(rename = "B")]
    Binary(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "SS")]
    StringSet(Vec<String>),
    #[serde(rename = "NS")]
    NumberSet(Vec<String>),
    #[serde(rename = "BS")]
    BinarySet(Vec<String>),
    #[serde(rename = "L")]
    List(Vec<TaggedValue>),
    #[serde(rename = "M")]
    Map(BTreeMap<String, TaggedValue>),
}

impl From<InvalidDecimal> for StoreError {
    fn from(err: InvalidDecimal) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl TryFrom<TaggedValue> for RecordValue {
    type Error = StoreError;

    fn try_from(tagged: TaggedValue) -> Result<Self, Self::Error> {
        Ok(match tagged {
            TaggedValue::String(s) => RecordValue::String(s),
            TaggedValue::Number(n) => RecordValue::Number(n.parse()?),
            TaggedValue::Binary(b) => RecordValue::Binary(decode_base64(&b)?),
            TaggedValue::Bool(b) => RecordValue::Bool(b),
            TaggedValue::Null(true) => RecordValue::Null,
            TaggedValue::Null(false) => {
                return Err(StoreError::Decode("NULL attribute must be true".to_string()));
            }
            TaggedValue::StringSet(items) => RecordValue::StringSet(items),
            TaggedValue::NumberSet(items) => RecordValue::NumberSet(
                items
                    .iter()
                    .map(|n| n.parse::<Decimal>())
                    .collect::<Result<_, _>>()?,
            ),
            TaggedValue::BinarySet(items) => RecordValue::BinarySet(
                items
                    .iter()
                    .map(|b| decode_base64(b))
                    .collect::<Result<_, _>>()?,
            ),
            TaggedValue::List(items) => RecordValue::List(
                items
                    .into_iter()
                    .map(RecordValue::try_from)
                    .collect::<Result<_, _>>()?,
            ),
            TaggedValue::Map(fields) => RecordValue::Map(decode_tagged_fields(fields)?),
        })
    }
}

fn decode_base64(text: &str) -> Result<Vec<u8>, StoreError> {
    STANDARD
        .decode(text)
        .map_err(|e| StoreError::Decode(format!("invalid base64 binary: {}", e)))
}

fn decode_tagged_fields(fields: BTreeMap<String, TaggedValue>) -> Result<Record, StoreError> {
    fields
        .into_iter()
        .map(|(name, value)| Ok((name, RecordValue::try_from(value)?)))
        .collect()
}

/// Decodes one item in tagged wire form.
pub fn decode_tagged_item(item: Value) -> Result<Record, StoreError> {
    let fields: BTreeMap<String, TaggedValue> =
        serde_json::from_value(item).map_err(|e| StoreError::Decode(e.to_string()))?;
    decode_tagged_fields(fields)
}

/// Decodes one item in plain JSON form.
pub fn decode_plain_item(item: Value) -> Result<Record, StoreError> {
    match item {
        Value::Object(fields) => fields
            .into_iter()
            .map(|(name, value)| Ok((name, decode_plain_value(value)?)))
            .collect(),
        other => Err(StoreError::Decode(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

fn decode_plain_value(value: Value) -> Result<RecordValue, StoreError> {
    Ok(match value {
        Value::Null => RecordValue::Null,
        Value::Bool(b) => RecordValue::Bool(b),
        Value::Number(n) => RecordValue::Number(n.to_string().parse()?),
        Value::String(s) => RecordValue::String(s),
        Value::Array(items) => RecordValue::List(
            items
                .into_iter()
                .map(decode_plain_value)
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(_) => RecordValue::Map(decode_plain_item(value)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::value::format_record;
    use serde_json::json;

    #[test]
    fn decodes_every_tag() {
        let item = json!({
            "bookid": {"N": "1"},
            "title": {"S": "Dune"},
            "price": {"N": "19.99"},
            "in_print": {"BOOL": true},
            "subtitle": {"NULL": true},
            "cover": {"B": "aGk="},
            "tags": {"SS": ["scifi", "classic"]},
            "ratings": {"NS": ["4", "4.5"]},
            "thumbs": {"BS": ["aGk="]},
            "authors": {"L": [{"S": "Frank Herbert"}, {"N": "1920"}]},
            "publisher": {"M": {"name": {"S": "Chilton"}, "year": {"N": "1965"}}}
        });

        let record = decode_tagged_item(item).unwrap();

        assert_eq!(
            format_record(&record),
            json!({
                "bookid": 1,
                "title": "Dune",
                "price": 19.99,
                "in_print": true,
                "subtitle": null,
                "cover": "aGk=",
                "tags": ["scifi", "classic"],
                "ratings": [4, 4.5],
                "thumbs": ["aGk="],
                "authors": ["Frank Herbert", 1920],
                "publisher": {"name": "Chilton", "year": 1965}
            })
        );
    }

    #[test]
    fn rejects_malformed_tagged_items() {
        let bad_number = json!({"price": {"N": "nineteen"}});
        assert!(matches!(
            decode_tagged_item(bad_number),
            Err(StoreError::Decode(_))
        ));

        let unknown_tag = json!({"price": {"X": "1"}});
        assert!(matches!(
            decode_tagged_item(unknown_tag),
            Err(StoreError::Decode(_))
        ));

        let untagged = json!({"price": 19.99});
        assert!(decode_tagged_item(untagged).is_err());

        let false_null = json!({"subtitle": {"NULL": false}});
        assert!(matches!(
            decode_tagged_item(false_null),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn plain_items_format_back_unchanged() {
        let item = json!({
            "bookid": 7,
            "title": "Hyperion",
            "price": 8.5,
            "available": false,
            "notes": null,
            "series": {"name": "Cantos", "books": [1, 2, 3.25, {"x": -1}]}
        });

        let record = decode_plain_item(item.clone()).unwrap();
        assert_eq!(format_record(&record), item);
    }

    #[test]
    fn plain_item_must_be_object() {
        assert!(decode_plain_item(json!([1, 2])).is_err());
    }
}
