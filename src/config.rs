//! Engine configuration.
//!
//! Loaded from a YAML file and overridable through `CROBAT_*` environment
//! variables:
//!
//! ```yaml
//! domain_file: /data/domains.csv
//! reverse_file: /data/reverse.csv
//! domain_index:
//!   backend: file
//!   path: /data/domains.idx
//! reverse_index:
//!   backend: remote
//!   url: http://127.0.0.1:7379/reverse
//! workers: 5
//! scan_timeout_ms: 100
//! reverse_bucket_size: 10
//! min_prefix_len: 16
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "CROBAT_";

/// Default number of workers per dispatcher.
pub const DEFAULT_WORKERS: usize = 5;

/// Default bucket width of the reverse index.
pub const DEFAULT_BUCKET_SIZE: u32 = 10;

/// Default narrowest-allowed prefix for reverse-range queries.
pub const DEFAULT_MIN_PREFIX_LEN: u8 = 16;

fn default_cache_capacity() -> usize {
    100_000
}

fn default_remote_timeout_ms() -> u64 {
    2_000
}

/// Where a [`PositionIndex`](crate::index::PositionIndex) comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum IndexSource {
    /// `key:::offset` file, optionally gzipped, loaded into memory
    File { path: PathBuf },
    /// HTTP point-lookup service
    Remote {
        url: String,
        #[serde(default = "default_cache_capacity")]
        cache_capacity: usize,
        #[serde(default = "default_remote_timeout_ms")]
        timeout_ms: u64,
    },
}

impl IndexSource {
    /// Interpret a bare string: URLs select the remote backend, anything
    /// else is a file path.
    pub fn from_value(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            IndexSource::Remote {
                url: value.to_string(),
                cache_capacity: default_cache_capacity(),
                timeout_ms: default_remote_timeout_ms(),
            }
        } else {
            IndexSource::File {
                path: PathBuf::from(value),
            }
        }
    }
}

impl Default for IndexSource {
    fn default() -> Self {
        IndexSource::File {
            path: PathBuf::new(),
        }
    }
}

/// Configuration for an [`Engine`](crate::Engine) and its dispatchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sorted `domain,tld,subdomain` dataset
    pub domain_file: PathBuf,
    /// Sorted `ipInt,hostname` dataset
    pub reverse_file: PathBuf,
    pub domain_index: IndexSource,
    pub reverse_index: IndexSource,
    /// Workers per dispatcher
    pub workers: usize,
    /// Request queue capacity per dispatcher
    pub queue_capacity: usize,
    /// Budget for a single cursor step, in milliseconds
    pub scan_timeout_ms: u64,
    /// Bucket width the reverse index was built with
    pub reverse_bucket_size: u32,
    /// Reverse-range queries broader than this prefix are rejected
    pub min_prefix_len: u8,
    /// Optional public suffix list extending the built-in table
    pub public_suffix_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            domain_file: PathBuf::new(),
            reverse_file: PathBuf::new(),
            domain_index: IndexSource::default(),
            reverse_index: IndexSource::default(),
            workers: DEFAULT_WORKERS,
            queue_capacity: 1,
            scan_timeout_ms: 100,
            reverse_bucket_size: DEFAULT_BUCKET_SIZE,
            min_prefix_len: DEFAULT_MIN_PREFIX_LEN,
            public_suffix_file: None,
        }
    }
}

impl EngineConfig {
    /// Load a YAML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse YAML config text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Apply `CROBAT_*` overrides from the process environment.
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok())
    }

    /// Apply overrides from `lookup`, which maps an unprefixed variable
    /// name such as `DOMAIN_FILE` to its value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DOMAIN_FILE") {
            self.domain_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("REVERSE_FILE") {
            self.reverse_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("DOMAIN_INDEX") {
            self.domain_index = IndexSource::from_value(&v);
        }
        if let Some(v) = lookup("REVERSE_INDEX") {
            self.reverse_index = IndexSource::from_value(&v);
        }
        if let Some(v) = lookup("WORKERS") {
            self.workers = parse_override("WORKERS", &v)?;
        }
        if let Some(v) = lookup("SCAN_TIMEOUT_MS") {
            self.scan_timeout_ms = parse_override("SCAN_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("REVERSE_BUCKET_SIZE") {
            self.reverse_bucket_size = parse_override("REVERSE_BUCKET_SIZE", &v)?;
        }
        if let Some(v) = lookup("MIN_PREFIX_LEN") {
            self.min_prefix_len = parse_override("MIN_PREFIX_LEN", &v)?;
        }
        Ok(self)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".to_string()));
        }
        if self.reverse_bucket_size == 0 {
            return Err(Error::Config("reverse_bucket_size must be positive".to_string()));
        }
        if self.min_prefix_len > 32 {
            return Err(Error::Config(format!(
                "min_prefix_len must be at most 32, got {}",
                self.min_prefix_len
            )));
        }
        Ok(())
    }

    /// Per-step scan budget.
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!("invalid value for {}{}: {:?}", ENV_PREFIX, name, value))
    })
}
