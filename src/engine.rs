//! The search engine context.
//!
//! An [`Engine`] holds everything a query needs: the dataset paths, both
//! position indices, the domain parser and the scan policy. It is built once
//! at startup and shared by reference with every worker; there is no global
//! state. Its query methods run synchronously on the calling thread, which
//! makes them the reference the dispatchers are measured against.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EngineConfig, DEFAULT_BUCKET_SIZE, DEFAULT_MIN_PREFIX_LEN};
use crate::cursor::{
    DomainCursor, DomainNeedle, Needle, RangeScanCursor, ReverseCursor, ReverseHits,
    ReverseNeedle, DEFAULT_SCAN_TIMEOUT,
};
use crate::domain::{DomainParser, NeedleKind};
use crate::index::{open_index, seek_offset, PositionIndex};
use crate::ipconv::{bucket_of, ip_to_int, parse_cidr};
use crate::{Error, Result};

/// Page size used when a caller gives none.
pub const DEFAULT_PAGE_LIMIT: usize = 100_000;

/// Pagination window over a query's matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: usize,
    pub take: usize,
}

impl Page {
    pub fn new(skip: usize, take: usize) -> Self {
        Self { skip, take }
    }

    /// The first `take` matches.
    pub fn first(take: usize) -> Self {
        Self { skip: 0, take }
    }

    /// Every match.
    pub fn unbounded() -> Self {
        Self {
            skip: 0,
            take: usize::MAX,
        }
    }

    /// Translate 1-based `page` / `limit` parameters.
    ///
    /// Missing values fall back to page 1 and [`DEFAULT_PAGE_LIMIT`]; page 0
    /// is treated as page 1.
    pub fn from_params(page: Option<usize>, limit: Option<usize>) -> Self {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        Self {
            skip: (page - 1).saturating_mul(limit),
            take: limit,
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::from_params(None, None)
    }
}

/// The domain query shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainMode {
    /// Every hostname under one registered domain
    Subdomains,
    /// Every hostname under the domain label, across all suffixes
    All,
    /// Every distinct `domain.tld` for the domain label
    Tlds,
}

impl DomainMode {
    /// Which needle this mode scans with.
    pub fn needle_kind(&self) -> NeedleKind {
        match self {
            DomainMode::Subdomains => NeedleKind::FullDomain,
            DomainMode::All | DomainMode::Tlds => NeedleKind::DomainOnly,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DomainMode::Subdomains => "subdomains",
            DomainMode::All => "all",
            DomainMode::Tlds => "tlds",
        }
    }
}

/// Shared, read-only search context.
pub struct Engine {
    domain_file: PathBuf,
    reverse_file: PathBuf,
    domain_index: Arc<dyn PositionIndex>,
    reverse_index: Arc<dyn PositionIndex>,
    parser: DomainParser,
    scan_timeout: Duration,
    bucket_size: u32,
    min_prefix_len: u8,
}

impl Engine {
    /// Create an engine with default policy.
    pub fn new(
        domain_file: impl Into<PathBuf>,
        domain_index: Arc<dyn PositionIndex>,
        reverse_file: impl Into<PathBuf>,
        reverse_index: Arc<dyn PositionIndex>,
    ) -> Self {
        Self {
            domain_file: domain_file.into(),
            reverse_file: reverse_file.into(),
            domain_index,
            reverse_index,
            parser: DomainParser::new(),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            bucket_size: DEFAULT_BUCKET_SIZE,
            min_prefix_len: DEFAULT_MIN_PREFIX_LEN,
        }
    }

    /// Build an engine from configuration, opening both indices.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let parser = match config.public_suffix_file {
            Some(ref path) => DomainParser::with_suffix_file(path)?,
            None => DomainParser::new(),
        };
        let domain_index = open_index(&config.domain_index)?;
        let reverse_index = open_index(&config.reverse_index)?;

        log::info!(
            "Engine ready: domain index {}, reverse index {}, bucket size {}",
            domain_index.backend(),
            reverse_index.backend(),
            config.reverse_bucket_size
        );

        Ok(Self::new(
            config.domain_file.clone(),
            domain_index,
            config.reverse_file.clone(),
            reverse_index,
        )
        .with_parser(parser)
        .with_scan_timeout(config.scan_timeout())
        .with_bucket_size(config.reverse_bucket_size)
        .with_min_prefix_len(config.min_prefix_len))
    }

    pub fn with_parser(mut self, parser: DomainParser) -> Self {
        self.parser = parser;
        self
    }

    /// Per-step cursor budget.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Bucket width the reverse index was built with.
    pub fn with_bucket_size(mut self, bucket_size: u32) -> Self {
        self.bucket_size = bucket_size.max(1);
        self
    }

    /// Narrowest prefix a reverse-range query may use.
    pub fn with_min_prefix_len(mut self, min_prefix_len: u8) -> Self {
        self.min_prefix_len = min_prefix_len.min(32);
        self
    }

    pub fn domain_file(&self) -> &Path {
        &self.domain_file
    }

    pub fn reverse_file(&self) -> &Path {
        &self.reverse_file
    }

    pub fn bucket_size(&self) -> u32 {
        self.bucket_size
    }

    pub fn min_prefix_len(&self) -> u8 {
        self.min_prefix_len
    }

    /// Open a cursor over the domain dataset for `query`.
    pub fn domain_cursor(&self, query: &str, mode: DomainMode) -> Result<DomainCursor> {
        if query.trim().is_empty() {
            return Err(Error::BlankQuery);
        }

        let parsed = self.parser.parse(query)?;
        let needle = match mode {
            DomainMode::Tlds => DomainNeedle::tld_variants(&parsed),
            _ => DomainNeedle::new(&parsed, mode.needle_kind()),
        };
        let offset = seek_offset(self.domain_index.as_ref(), parsed.index_key())?;

        log::debug!(
            "{} {}: needle {:?} from offset {}",
            mode.name(),
            query,
            needle.prefix(),
            offset
        );
        Ok(RangeScanCursor::open(&self.domain_file, offset, needle, query)?
            .with_timeout(self.scan_timeout))
    }

    /// Open a cursor over the reverse dataset for an address or CIDR block.
    ///
    /// No range-size policy is applied here; see [`reverse_range`](Self::reverse_range).
    pub fn reverse_cursor(&self, query: &str) -> Result<ReverseCursor> {
        if query.trim().is_empty() {
            return Err(Error::BlankQuery);
        }

        let net = parse_cidr(query)?;
        let needle = ReverseNeedle::new(u32::from(net.network()), u32::from(net.broadcast()));
        let offset = self.seed_reverse(needle.min, needle.max)?;

        log::debug!(
            "reverse {}: range [{}, {}] from offset {}",
            query,
            needle.min,
            needle.max,
            offset
        );
        Ok(RangeScanCursor::open(&self.reverse_file, offset, needle, query)?
            .with_timeout(self.scan_timeout))
    }

    /// Find the offset to start a reverse scan for `[min, max]` from.
    ///
    /// Buckets without addresses have no index entry, so successive bucket
    /// ids are probed until one is present or the range is exhausted. A
    /// bucket recorded at offset zero holds part of the range but cannot be
    /// seeked to, so probing stops there rather than skipping its records.
    fn seed_reverse(&self, min: u32, max: u32) -> Result<u64> {
        let first = bucket_of(min, self.bucket_size);
        let last = bucket_of(max, self.bucket_size);

        for bucket in first..=last {
            let key = bucket.to_string();
            match self.reverse_index.lookup(&key)? {
                Some(0) => return Err(Error::NotFound(key)),
                Some(offset) => return Ok(offset),
                None => continue,
            }
        }

        Err(Error::NotFound(first.to_string()))
    }

    /// Check a CIDR block against the range-size policy.
    pub fn check_range(&self, cidr: &str) -> Result<Ipv4Net> {
        let net = parse_cidr(cidr)?;
        if net.prefix_len() < self.min_prefix_len {
            return Err(Error::LargeRangeRejected {
                cidr: cidr.trim().to_string(),
                prefix_len: net.prefix_len(),
                min_prefix_len: self.min_prefix_len,
            });
        }
        Ok(net)
    }

    /// Run a domain query.
    pub fn search_domains(&self, query: &str, mode: DomainMode, page: Page) -> Result<Vec<String>> {
        let cursor = self.domain_cursor(query, mode)?;
        collect_page(cursor, page)
    }

    /// Hostnames under the registered domain of `domain`.
    pub fn subdomains(&self, domain: &str, page: Page) -> Result<Vec<String>> {
        self.search_domains(domain, DomainMode::Subdomains, page)
    }

    /// Distinct `domain.tld` variants of the domain label of `domain`.
    pub fn tlds(&self, domain: &str, page: Page) -> Result<Vec<String>> {
        self.search_domains(domain, DomainMode::Tlds, page)
    }

    /// Hostnames under the domain label of `domain`, across all suffixes.
    pub fn all(&self, domain: &str, page: Page) -> Result<Vec<String>> {
        self.search_domains(domain, DomainMode::All, page)
    }

    /// Hostnames recorded for a single address.
    pub fn reverse_lookup(&self, ip: &str, page: Page) -> Result<ReverseHits> {
        if ip.trim().is_empty() {
            return Err(Error::BlankQuery);
        }
        if ip.contains('/') {
            return Err(Error::InvalidAddress(ip.trim().to_string()));
        }
        ip_to_int(ip)?;
        collect_page(self.reverse_cursor(ip)?, page)
    }

    /// Hostnames recorded for every address in a CIDR block.
    pub fn reverse_range(&self, cidr: &str, page: Page) -> Result<ReverseHits> {
        if cidr.trim().is_empty() {
            return Err(Error::BlankQuery);
        }
        self.check_range(cidr)?;
        collect_page(self.reverse_cursor(cidr)?, page)
    }
}

/// Skip, take and close, surfacing whatever ended the scan early.
fn collect_page<N: Needle>(mut cursor: RangeScanCursor<N>, page: Page) -> Result<N::Output> {
    let out = cursor.skip(page.skip).take(page.take);
    cursor.close();
    match cursor.take_error() {
        Some(e) => Err(e),
        None => Ok(out),
    }
}
