//! Book lookup: the get-or-list operation behind every endpoint.
//!
//! A [`LookupEvent`] goes in, a [`ProxyResponse`] comes out. Every failure is
//! turned into a response here; nothing propagates past [`BookLookup::handle`].

use crate::config::HandlerVariant;
use crate::storage::{format_record, BookKey, RecordStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Query string parameter carrying the book identifier.
pub const BOOK_ID_PARAM: &str = "bookid";

/// Incoming proxy event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupEvent {
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

impl LookupEvent {
    /// Builds an event from decoded query parameters; no parameters means no container.
    pub fn from_query(params: HashMap<String, String>) -> Self {
        Self {
            query_string_parameters: (!params.is_empty()).then_some(params),
        }
    }

    pub fn book_id(&self) -> Option<&str> {
        self.query_string_parameters
            .as_ref()?
            .get(BOOK_ID_PARAM)
            .map(String::as_str)
    }
}

/// Outgoing proxy response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Missing query string parameter 'bookid'")]
    MissingParameter,

    #[error("Book not found")]
    NotFound,

    #[error("Unable to read item")]
    Read(String),

    #[error("Unable to scan items")]
    Scan(String),
}

impl LookupError {
    pub fn status_code(&self) -> u16 {
        match self {
            LookupError::MissingParameter => 400,
            LookupError::NotFound => 404,
            LookupError::Read(_) | LookupError::Scan(_) => 500,
        }
    }

    /// Failure text reported alongside 500s.
    pub fn detail(&self) -> Option<&str> {
        match self {
            LookupError::Read(msg) | LookupError::Scan(msg) => Some(msg.as_str()),
            _ => None,
        }
    }

    fn body(&self) -> Value {
        serde_json::to_value(ErrorBody {
            error: self.to_string(),
            message: self.detail().map(str::to_string),
        })
        .unwrap_or(Value::Null)
    }
}

/// Parses the identifier with integer literal syntax and no size limit.
fn parse_book_id(raw: &str) -> Result<BookKey, LookupError> {
    raw.parse::<BookKey>().map_err(|_| {
        LookupError::Read(format!(
            "invalid literal for {}: '{}'",
            BOOK_ID_PARAM, raw
        ))
    })
}

/// Headers added to every response in the listing variant.
fn cors_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
    ])
}

/// Record lookup handler.
pub struct BookLookup {
    store: Arc<dyn RecordStore>,
    variant: HandlerVariant,
}

impl BookLookup {
    pub fn new(store: Arc<dyn RecordStore>, variant: HandlerVariant) -> Self {
        Self { store, variant }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn variant(&self) -> HandlerVariant {
        self.variant
    }

    /// Handles one event. Always produces a response.
    pub async fn handle(&self, event: &LookupEvent) -> ProxyResponse {
        info!(
            table = %self.store.table_name(),
            variant = %self.variant,
            bookid = event.book_id(),
            "Handling lookup"
        );

        let result = match (event.book_id(), self.variant) {
            (Some(raw), _) => self.get(raw).await,
            (None, HandlerVariant::Strict) => Err(LookupError::MissingParameter),
            (None, HandlerVariant::Listing) => self.list().await,
        };

        match result {
            Ok(body) => self.respond(200, &body),
            Err(err) => {
                if let Some(detail) = err.detail() {
                    error!("{}. Error: {}", err, detail);
                }
                self.respond(err.status_code(), &err.body())
            }
        }
    }

    async fn get(&self, raw: &str) -> Result<Value, LookupError> {
        let key = parse_book_id(raw)?;

        let record = self
            .store
            .get_item(&key)
            .await
            .map_err(|e| LookupError::Read(e.to_string()))?;

        match record {
            Some(record) => Ok(format_record(&record)),
            None => Err(LookupError::NotFound),
        }
    }

    async fn list(&self) -> Result<Value, LookupError> {
        let records = self
            .store
            .scan()
            .await
            .map_err(|e| LookupError::Scan(e.to_string()))?;

        info!(count = records.len(), "Listed records");
        Ok(Value::Array(records.iter().map(format_record).collect()))
    }

    fn respond(&self, status_code: u16, body: &Value) -> ProxyResponse {
        ProxyResponse {
            status_code,
            body: body.to_string(),
            headers: match self.variant {
                HandlerVariant::Strict => None,
                HandlerVariant::Listing => Some(cors_headers()),
            },
        }
    }
}
