use super::codec::{decode_plain_item, decode_tagged_item};
use super::{record_key, BookKey, Record, RecordStore, StoreError};
use crate::config::SeedFormat;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// In-process table, read-only once built.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    table_name: String,
    key_attribute: String,
    records: BTreeMap<BookKey, Record>,
}

impl MemoryStore {
    /// Creates an empty table.
    pub fn new(table_name: &str, key_attribute: &str) -> Self {
        Self {
            table_name: table_name.to_string(),
            key_attribute: key_attribute.to_string(),
            records: BTreeMap::new(),
        }
    }

    /// Creates a table holding `records`.
    pub fn with_records(
        table_name: &str,
        key_attribute: &str,
        records: impl IntoIterator<Item = Record>,
    ) -> Result<Self, StoreError> {
        let mut store = Self::new(table_name, key_attribute);
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    /// Loads a table from a JSON array of items.
    pub fn from_seed_file(
        table_name: &str,
        key_attribute: &str,
        path: &Path,
        format: SeedFormat,
    ) -> Result<Self, StoreError> {
        info!(path = %path.display(), ?format, "Loading seed file");

        let raw = fs::read_to_string(path).map_err(|source| StoreError::Seed {
            path: path.to_path_buf(),
            source,
        })?;
        let items: Vec<Value> =
            serde_json::from_str(&raw).map_err(|e| StoreError::Decode(e.to_string()))?;

        let records = items
            .into_iter()
            .map(|item| match format {
                SeedFormat::Plain => decode_plain_item(item),
                SeedFormat::Tagged => decode_tagged_item(item),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::with_records(table_name, key_attribute, records)
    }

    /// Adds a record, enforcing key uniqueness.
    pub fn insert(&mut self, record: Record) -> Result<(), StoreError> {
        let key = record_key(&record, &self.key_attribute)?;
        if self.records.contains_key(&key) {
            return Err(StoreError::DuplicateKey(key));
        }
        self.records.insert(key, record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_item(&self, key: &BookKey) -> Result<Option<Record>, StoreError> {
        Ok(self.records.get(key).cloned())
    }

    async fn scan(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.records.values().cloned().collect())
    }
}
