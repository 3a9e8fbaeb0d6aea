//! Application configuration.
//!
//! Loaded from a TOML file (`BOOKS_CONFIG`, falling back to `config.toml`);
//! a missing file means defaults. `PORT` and `BOOKS_TABLE` override the file.

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub handler: HandlerConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub variant: HandlerVariant,
}

/// How the handler treats a request without `bookid`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerVariant {
    /// Reject with 400; responses carry no headers.
    #[default]
    Strict,
    /// List the whole table; responses carry CORS headers.
    Listing,
}

impl fmt::Display for HandlerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerVariant::Strict => f.write_str("strict"),
            HandlerVariant::Listing => f.write_str("listing"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Dynamodb,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub table_name: String,
    pub key_attribute: String,
    pub memory: MemoryConfig,
    pub dynamodb: DynamoConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            table_name: "Books".to_string(),
            key_attribute: "bookid".to_string(),
            memory: MemoryConfig::default(),
            dynamodb: DynamoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub seed_path: Option<PathBuf>,
    pub seed_format: SeedFormat,
}

/// Shape of the items in a seed file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedFormat {
    #[default]
    Plain,
    Tagged,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DynamoConfig {
    /// Overrides the service endpoint, e.g. for DynamoDB Local.
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
}

impl AppConfig {
    /// Loads configuration from file and environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("BOOKS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml"));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("PORT is not a valid port: {:?}", port))?;
        }
        if let Some(table) = lookup("BOOKS_TABLE") {
            self.store.table_name = table;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.server.port != 0, "server.port must be non-zero");
        ensure!(
            !self.store.table_name.trim().is_empty(),
            "store.table_name must not be empty"
        );
        ensure!(
            !self.store.key_attribute.trim().is_empty(),
            "store.key_attribute must not be empty"
        );
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
