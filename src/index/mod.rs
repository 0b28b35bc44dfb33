//! Sparse key → byte-offset indices over the sorted datasets.
//!
//! Two interchangeable backends implement [`PositionIndex`]:
//! - [`MemoryIndex`]: a `key:::offset` file parsed once into a hash table
//! - [`RemoteIndex`]: point lookups against an HTTP key-value service
//!
//! Callers never branch on which one is active; [`seek_offset`] applies the
//! shared "offset zero means absent" rule on top of either.

mod memory;
mod remote;

pub use memory::MemoryIndex;
pub use remote::{RemoteIndex, RemoteIndexConfig};

use std::sync::Arc;

use crate::config::IndexSource;
use crate::{Error, Result};

/// Read-only key → offset lookup.
///
/// Implementations must be safe to share across worker threads without
/// external locking once constructed.
pub trait PositionIndex: Send + Sync {
    /// Look up the byte offset recorded for `key`.
    fn lookup(&self, key: &str) -> Result<Option<u64>>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

impl<T: PositionIndex + ?Sized> PositionIndex for Arc<T> {
    fn lookup(&self, key: &str) -> Result<Option<u64>> {
        (**self).lookup(key)
    }

    fn backend(&self) -> &'static str {
        (**self).backend()
    }
}

/// Resolve `key` to a dataset offset a cursor may seek to.
///
/// Position 0 is never a valid resume point, so a zero offset is reported
/// as [`Error::NotFound`] exactly like a missing key.
pub fn seek_offset(index: &dyn PositionIndex, key: &str) -> Result<u64> {
    match index.lookup(key)? {
        Some(offset) if offset > 0 => Ok(offset),
        _ => Err(Error::NotFound(key.to_string())),
    }
}

/// Open the backend described by `source`.
pub fn open_index(source: &IndexSource) -> Result<Arc<dyn PositionIndex>> {
    match source {
        IndexSource::File { path } => Ok(Arc::new(MemoryIndex::load(path)?)),
        IndexSource::Remote {
            url,
            cache_capacity,
            timeout_ms,
        } => {
            let config = RemoteIndexConfig {
                cache_capacity: *cache_capacity,
                timeout: std::time::Duration::from_millis(*timeout_ms),
            };
            Ok(Arc::new(RemoteIndex::with_config(url, config)))
        }
    }
}
