//! Engine configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use turbo_cache::{cache_key, CacheError, DurableStorage, FileStorage, MemoryStorage, TtlConfig};
use turbo_commerce::Currency;
use turbo_data::{FetchClient, FetchError};

/// Errors while loading configuration or wiring collaborators from it.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Storage setup failed: {0}")]
    Storage(#[from] CacheError),

    #[error("HTTP client setup failed: {0}")]
    Http(#[from] FetchError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartConfig {
    /// Cart service connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// TTL classes for cached snapshots.
    #[serde(default)]
    pub cache: TtlConfig,

    /// Where the add-on ledger is persisted.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Currency assumed when a snapshot does not name one we know.
    #[serde(default)]
    pub currency: Currency,
}

impl CartConfig {
    /// Load config from a file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: CartConfig = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.upstream.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "upstream.base_url must be an http(s) URL, got {:?}",
                self.upstream.base_url
            )));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_secs must be positive".into()));
        }
        if self.cache.short_ttl_secs > self.cache.long_ttl_secs {
            return Err(ConfigError::Invalid(
                "cache.short_ttl_secs must not exceed cache.long_ttl_secs".into(),
            ));
        }
        if self.storage.key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.key must not be empty".into()));
        }
        Ok(())
    }

    /// Build an HTTP client for the cart service.
    pub fn cart_client(&self) -> Result<FetchClient, ConfigError> {
        self.upstream.client(&self.upstream.base_url)
    }

    /// Build an HTTP client for the add-on catalog.
    pub fn catalog_client(&self) -> Result<FetchClient, ConfigError> {
        let base = self
            .upstream
            .catalog_url
            .as_deref()
            .unwrap_or(&self.upstream.base_url);
        self.upstream.client(base)
    }

    /// Open the configured storage backend.
    pub fn open_storage(&self) -> Result<Arc<dyn DurableStorage>, ConfigError> {
        match self.storage.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageBackend::File => Ok(Arc::new(FileStorage::open(self.storage.dir.clone())?)),
        }
    }
}

/// Cart service connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the cart API, e.g. `https://shop.example.com/wp-json/wc/store/v1`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the add-on catalog when it is served elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_url: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Headers sent with every request (e.g. a `Nonce`).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8080/wp-json/wc/store/v1".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            catalog_url: None,
            timeout_secs: default_timeout_secs(),
            headers: BTreeMap::new(),
        }
    }
}

impl UpstreamConfig {
    fn client(&self, base_url: &str) -> Result<FetchClient, ConfigError> {
        let mut client = FetchClient::reqwest(Duration::from_secs(self.timeout_secs))?
            .with_base_url(base_url)
            .with_default_header("Accept", "application/json");
        for (key, value) in &self.headers {
            client = client.with_default_header(key.clone(), value.clone());
        }
        Ok(client)
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Process memory only; nothing survives a restart.
    Memory,
    /// One JSON file per key under `dir`.
    #[default]
    File,
}

/// Ledger persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory for the file backend.
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,

    /// Namespaced key the ledger snapshot is stored under.
    #[serde(default = "default_ledger_key")]
    pub key: String,
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".turbo-cart")
}

fn default_ledger_key() -> String {
    cache_key!("turbo-cart", "addon-ledger")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            dir: default_storage_dir(),
            key: default_ledger_key(),
        }
    }
}
