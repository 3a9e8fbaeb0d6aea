use super::value::{Decimal, Record, RecordValue};
use super::{BookKey, RecordStore, StoreError};
use crate::config::DynamoConfig;
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use tracing::debug;

/// Table served from Amazon DynamoDB.
pub struct DynamoStore {
    client: Client,
    table_name: String,
    key_attribute: String,
}

impl DynamoStore {
    pub fn new(client: Client, table_name: &str, key_attribute: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
            key_attribute: key_attribute.to_string(),
        }
    }

    /// Builds a client from the ambient AWS configuration.
    pub async fn connect(table_name: &str, key_attribute: &str, config: &DynamoConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self::new(Client::new(&sdk_config), table_name, key_attribute)
    }
}

fn backend_error<E>(err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Backend(DisplayErrorContext(&err).to_string())
}

fn decode_item(item: HashMap<String, AttributeValue>) -> Result<Record, StoreError> {
    item.into_iter()
        .map(|(name, value)| Ok((name, decode_attribute(value)?)))
        .collect()
}

fn decode_attribute(value: AttributeValue) -> Result<RecordValue, StoreError> {
    Ok(match value {
        AttributeValue::S(s) => RecordValue::String(s),
        AttributeValue::N(n) => RecordValue::Number(n.parse()?),
        AttributeValue::Bool(b) => RecordValue::Bool(b),
        AttributeValue::Null(_) => RecordValue::Null,
        AttributeValue::B(blob) => RecordValue::Binary(blob.into_inner()),
        AttributeValue::Ss(items) => RecordValue::StringSet(items),
        AttributeValue::Ns(items) => RecordValue::NumberSet(
            items
                .iter()
                .map(|n| n.parse::<Decimal>())
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::Bs(items) => {
            RecordValue::BinarySet(items.into_iter().map(Blob::into_inner).collect())
        }
        AttributeValue::L(items) => RecordValue::List(
            items
                .into_iter()
                .map(decode_attribute)
                .collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(fields) => RecordValue::Map(decode_item(fields)?),
        other => {
            return Err(StoreError::Decode(format!(
                "unsupported attribute type: {:?}",
                other
            )));
        }
    })
}

#[async_trait]
impl RecordStore for DynamoStore {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn backend(&self) -> &'static str {
        "dynamodb"
    }

    async fn get_item(&self, key: &BookKey) -> Result<Option<Record>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(&self.key_attribute, AttributeValue::N(key.to_string()))
            .send()
            .await
            .map_err(backend_error)?;

        output.item.map(decode_item).transpose()
    }

    async fn scan(&self) -> Result<Vec<Record>, StoreError> {
        let mut records = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(backend_error)?;

            for item in output.items.unwrap_or_default() {
                records.push(decode_item(item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => {
                    debug!(fetched = records.len(), "Scan page complete, continuing");
                    start_key = Some(key);
                }
                _ => break,
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::format_record;
    use serde_json::json;

    #[test]
    fn decodes_sdk_attributes() {
        let item = HashMap::from([
            ("bookid".to_string(), AttributeValue::N("1".into())),
            ("title".to_string(), AttributeValue::S("Dune".into())),
            ("price".to_string(), AttributeValue::N("19.99".into())),
            (
                "tags".to_string(),
                AttributeValue::L(vec![
                    AttributeValue::S("scifi".into()),
                    AttributeValue::M(HashMap::from([(
                        "rank".to_string(),
                        AttributeValue::N("2.5".into()),
                    )])),
                ]),
            ),
            ("cover".to_string(), AttributeValue::B(Blob::new(b"hi".to_vec()))),
            ("gone".to_string(), AttributeValue::Null(true)),
        ]);

        let record = decode_item(item).unwrap();
        assert_eq!(
            format_record(&record),
            json!({
                "bookid": 1,
                "title": "Dune",
                "price": 19.99,
                "tags": ["scifi", {"rank": 2.5}],
                "cover": "aGk=",
                "gone": null
            })
        );
    }

    #[test]
    fn bad_number_is_a_decode_error() {
        let item = HashMap::from([("price".to_string(), AttributeValue::N("x".into()))]);
        assert!(matches!(decode_item(item), Err(StoreError::Decode(_))));
    }
}
