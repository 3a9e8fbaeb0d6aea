pub mod codec;
pub mod dynamodb;
pub mod key;
pub mod memory;
pub mod value;

pub use dynamodb::DynamoStore;
pub use key::BookKey;
pub use memory::MemoryStore;
pub use value::{format_record, Record, RecordValue};

use crate::config::{StoreBackend, StoreConfig};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors raised by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing service failed or could not be reached.
    #[error("{0}")]
    Backend(String),

    /// An item could not be decoded into native values.
    #[error("failed to decode item: {0}")]
    Decode(String),

    #[error("record has no integer key attribute '{0}'")]
    InvalidKey(String),

    #[error("duplicate key {0}")]
    DuplicateKey(BookKey),

    #[error("failed to read seed file {path}: {source}")]
    Seed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read access to a table of records keyed by an integer.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Name of the table being served.
    fn table_name(&self) -> &str;

    /// Short backend identifier, reported by the health endpoint.
    fn backend(&self) -> &'static str;

    /// Fetches the record whose key equals `key`.
    async fn get_item(&self, key: &BookKey) -> Result<Option<Record>, StoreError>;

    /// Returns every record in the table.
    async fn scan(&self) -> Result<Vec<Record>, StoreError>;
}

/// Extracts the integer key of a record.
pub fn record_key(record: &Record, key_attribute: &str) -> Result<BookKey, StoreError> {
    record
        .get(key_attribute)
        .and_then(RecordValue::as_decimal)
        .and_then(|n| n.as_str().parse().ok())
        .ok_or_else(|| StoreError::InvalidKey(key_attribute.to_string()))
}

/// Opens the store selected by configuration.
pub async fn open(config: &StoreConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StoreBackend::Memory => {
            let store = match &config.memory.seed_path {
                Some(path) => MemoryStore::from_seed_file(
                    &config.table_name,
                    &config.key_attribute,
                    path,
                    config.memory.seed_format,
                )?,
                None => MemoryStore::new(&config.table_name, &config.key_attribute),
            };
            info!(records = store.len(), "In-memory table ready");
            Arc::new(store)
        }
        StoreBackend::Dynamodb => {
            let store =
                DynamoStore::connect(&config.table_name, &config.key_attribute, &config.dynamodb)
                    .await;
            info!(
                endpoint = config.dynamodb.endpoint_url.as_deref().unwrap_or("default"),
                "DynamoDB client ready"
            );
            Arc::new(store)
        }
    };

    Ok(store)
}
