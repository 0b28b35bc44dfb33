//! Remote index backend: one HTTP point lookup per key.
//!
//! The service answers `GET {base_url}/{key}` with the decimal offset as the
//! response body, or `404 Not Found` when the key has no entry. The index is
//! immutable for the life of the process, so answers (including misses) are
//! memoised in a bounded cache.

use quick_cache::sync::Cache;
use std::time::Duration;

use super::PositionIndex;
use crate::{Error, Result};

/// Default number of memoised lookups.
const DEFAULT_CACHE_CAPACITY: usize = 100_000;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for [`RemoteIndex`].
#[derive(Debug, Clone)]
pub struct RemoteIndexConfig {
    /// Maximum number of cached lookups; `0` disables caching.
    pub cache_capacity: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RemoteIndexConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Index backed by a remote key-value service.
pub struct RemoteIndex {
    base_url: String,
    agent: ureq::Agent,
    cache: Option<Cache<String, Option<u64>>>,
}

impl RemoteIndex {
    /// Create a client with default configuration.
    pub fn new(base_url: &str) -> Self {
        Self::with_config(base_url, RemoteIndexConfig::default())
    }

    /// Create a client with custom configuration.
    pub fn with_config(base_url: &str, config: RemoteIndexConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        let cache = if config.cache_capacity > 0 {
            Some(Cache::new(config.cache_capacity))
        } else {
            None
        };

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
            cache,
        }
    }

    /// The service URL a key is fetched from.
    fn key_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(key))
    }

    fn fetch(&self, key: &str) -> Result<Option<u64>> {
        let url = self.key_url(key);
        let response = match self.agent.get(&url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(404, _)) => return Ok(None),
            Err(ureq::Error::Status(code, _)) => {
                return Err(Error::Remote(format!("HTTP error {} for {}", code, url)))
            }
            Err(ureq::Error::Transport(t)) => {
                return Err(Error::Remote(format!("transport error: {}", t)))
            }
        };

        let body = response
            .into_string()
            .map_err(|e| Error::Remote(format!("failed to read response: {}", e)))?;
        let body = body.trim();

        // Some stores answer a miss with an empty body instead of a 404
        if body.is_empty() {
            return Ok(None);
        }

        body.parse::<u64>()
            .map(Some)
            .map_err(|_| Error::InvalidIndexEntry(format!("{}:::{}", key, body)))
    }

    /// Base URL of the service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl PositionIndex for RemoteIndex {
    fn lookup(&self, key: &str) -> Result<Option<u64>> {
        if let Some(ref cache) = self.cache {
            if let Some(hit) = cache.get(key) {
                return Ok(hit);
            }
        }

        let offset = self.fetch(key)?;
        log::debug!("Remote index lookup {} -> {:?}", key, offset);

        if let Some(ref cache) = self.cache {
            cache.insert(key.to_string(), offset);
        }
        Ok(offset)
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}
