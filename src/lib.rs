//! Sonarsearch - indexed range scans over sorted DNS reconnaissance datasets.
//!
//! This crate answers two kinds of question against flat, pre-sorted
//! datasets with hundreds of millions of lines:
//!
//! - **Forward**: which hostnames exist under `acme.com`, and under which
//!   public suffixes does `acme` appear?
//! - **Reverse**: which hostnames resolved to `1.2.3.4`, or to anything in
//!   `1.2.3.0/24`?
//!
//! # How a query runs
//!
//! 1. A sparse [`PositionIndex`] maps a key (a domain label, or a bucket of
//!    IPv4 integers) to a byte offset in the dataset.
//! 2. A [`RangeScanCursor`] seeks there and reads forward, skipping the few
//!    lines the coarse index lands before the wanted range, then yielding the
//!    contiguous run of matches and stopping at the first line past it.
//! 3. Each cursor step has a wall-clock budget (100ms by default), so a slow
//!    disk or a dense bucket ends in [`Error::ScanTimeout`] instead of a hung
//!    caller.
//! 4. A [`QueryDispatcher`] per dataset runs queries on a fixed pool of
//!    workers behind a bounded queue, which is what bounds concurrent disk
//!    access.
//!
//! # Quick Start
//!
//! ```ignore
//! use sonarsearch::{EngineConfig, Page, SearchService};
//!
//! let config = EngineConfig::load("sonarsearch.yaml")?.with_env()?;
//! let service = SearchService::from_config(&config)?;
//!
//! let hosts = service.subdomains("acme.com", Page::first(100))?;
//! let reverse = service.reverse_range("1.2.3.0/24", Page::default())?;
//! ```
//!
//! # Dataset formats
//!
//! - Domain records: `domain,tld,subdomain\n`, sorted by `(domain, tld, subdomain)`
//! - Reverse records: `ipInt,hostname\n`, sorted numerically by `ipInt`
//! - Index files: `key:::offset\n`, optionally gzipped

mod error;

pub mod config;
pub mod cursor;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod index;
pub mod ipconv;
pub mod service;

// Re-export core types
pub use error::{Error, Result};

pub use config::{EngineConfig, IndexSource};
pub use cursor::{
    DomainCursor, DomainRecord, RangeScanCursor, ReverseCursor, ReverseHits, ReverseMatch,
    ReverseRecord, ScanState,
};
pub use dispatch::{Job, QueryDispatcher, Reply};
pub use domain::{DomainParser, NeedleKind, ParsedDomain};
pub use engine::{DomainMode, Engine, Page};
pub use index::{MemoryIndex, PositionIndex, RemoteIndex};
pub use service::{DomainQuery, ReverseQuery, ReverseScope, SearchService};
