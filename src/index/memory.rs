//! In-memory index loaded from a `key:::offset` file.

use ahash::AHashMap;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::PositionIndex;
use crate::{Error, Result};

/// Separator between key and offset in index files.
pub const INDEX_SEPARATOR: &str = ":::";

/// Fully materialised key → offset table.
///
/// Built once at startup and never mutated afterwards, so lookups need no
/// synchronisation.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: AHashMap<String, u64>,
}

impl MemoryIndex {
    /// Load an index file, gunzipping it first if it starts with the gzip magic.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = BufReader::new(File::open(path)?);
        let gzipped = is_gzip(file.fill_buf()?);

        let index = if gzipped {
            Self::from_reader(BufReader::new(GzDecoder::new(file)))?
        } else {
            Self::from_reader(file)?
        };

        log::info!(
            "Loaded {} index entries from {:?}{}",
            index.len(),
            path,
            if gzipped { " (gzip)" } else { "" }
        );
        Ok(index)
    }

    /// Parse `key:::offset` lines.
    ///
    /// Lines without a separator are ignored, duplicate keys keep the last
    /// offset, and a non-decimal offset fails the whole load.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut entries = AHashMap::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim_end_matches('\r');

            let Some((key, offset)) = line.split_once(INDEX_SEPARATOR) else {
                continue;
            };

            let offset = offset
                .trim()
                .parse::<u64>()
                .map_err(|_| Error::InvalidIndexEntry(line.to_string()))?;
            entries.insert(key.to_string(), offset);
        }

        Ok(Self { entries })
    }

    /// Build an index directly from pairs.
    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, u64)>,
    {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PositionIndex for MemoryIndex {
    fn lookup(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.entries.get(key).copied())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}
