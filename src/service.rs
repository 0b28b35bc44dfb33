//! The query surface consumed by protocol front ends.
//!
//! [`SearchService`] runs one [`QueryDispatcher`] per dataset and exposes
//! the five query shapes. Range-size policy is applied here, before a
//! reverse-range query is queued, so an oversized request never occupies a
//! worker.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::cursor::ReverseHits;
use crate::dispatch::{Job, QueryDispatcher, Reply};
use crate::engine::{DomainMode, Page};
use crate::{Engine, Result};

/// A query against the domain dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainQuery {
    pub query: String,
    pub mode: DomainMode,
    pub page: Page,
}

impl DomainQuery {
    pub fn new(query: impl Into<String>, mode: DomainMode, page: Page) -> Self {
        Self {
            query: query.into(),
            mode,
            page,
        }
    }
}

impl Job for DomainQuery {
    type Output = Vec<String>;

    fn run(&self, engine: &Engine) -> Result<Vec<String>> {
        engine.search_domains(&self.query, self.mode, self.page)
    }

    fn describe(&self) -> String {
        format!("{} {:?}", self.mode.name(), self.query)
    }
}

/// Whether a reverse query names one address or a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReverseScope {
    Address,
    Range,
}

/// A query against the reverse dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseQuery {
    pub query: String,
    pub scope: ReverseScope,
    pub page: Page,
}

impl ReverseQuery {
    pub fn new(query: impl Into<String>, scope: ReverseScope, page: Page) -> Self {
        Self {
            query: query.into(),
            scope,
            page,
        }
    }
}

impl Job for ReverseQuery {
    type Output = ReverseHits;

    fn run(&self, engine: &Engine) -> Result<ReverseHits> {
        match self.scope {
            ReverseScope::Address => engine.reverse_lookup(&self.query, self.page),
            ReverseScope::Range => engine.reverse_range(&self.query, self.page),
        }
    }

    fn describe(&self) -> String {
        format!("reverse {:?}", self.query)
    }
}

/// Domain and reverse dispatchers over one shared engine.
pub struct SearchService {
    engine: Arc<Engine>,
    domains: QueryDispatcher<DomainQuery>,
    reverse: QueryDispatcher<ReverseQuery>,
}

impl SearchService {
    /// Start both dispatchers with `workers` threads each.
    pub fn new(engine: Arc<Engine>, workers: usize, queue_capacity: usize) -> Result<Self> {
        let domains = QueryDispatcher::new("domain", Arc::clone(&engine), workers, queue_capacity)?;
        let reverse = QueryDispatcher::new("reverse", Arc::clone(&engine), workers, queue_capacity)?;
        Ok(Self {
            engine,
            domains,
            reverse,
        })
    }

    /// Build the engine and both dispatchers from configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let engine = Arc::new(Engine::from_config(config)?);
        Self::new(engine, config.workers, config.queue_capacity)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn domain_dispatcher(&self) -> &QueryDispatcher<DomainQuery> {
        &self.domains
    }

    pub fn reverse_dispatcher(&self) -> &QueryDispatcher<ReverseQuery> {
        &self.reverse
    }

    /// Queue a domain query without waiting for it.
    pub fn submit_domain(&self, query: DomainQuery) -> Result<Reply<Vec<String>>> {
        self.domains.submit(query)
    }

    /// Queue a reverse query without waiting for it.
    pub fn submit_reverse(&self, query: ReverseQuery) -> Result<Reply<ReverseHits>> {
        if query.scope == ReverseScope::Range {
            self.engine.check_range(&query.query)?;
        }
        self.reverse.submit(query)
    }

    /// Hostnames under the registered domain of `domain`.
    pub fn subdomains(&self, domain: &str, page: Page) -> Result<Vec<String>> {
        self.domains
            .query(DomainQuery::new(domain, DomainMode::Subdomains, page))
    }

    /// Distinct `domain.tld` variants of the domain label.
    pub fn tlds(&self, domain: &str, page: Page) -> Result<Vec<String>> {
        self.domains
            .query(DomainQuery::new(domain, DomainMode::Tlds, page))
    }

    /// Hostnames under the domain label across all suffixes.
    pub fn all(&self, domain: &str, page: Page) -> Result<Vec<String>> {
        self.domains
            .query(DomainQuery::new(domain, DomainMode::All, page))
    }

    /// Hostnames recorded for one address.
    pub fn reverse_lookup(&self, ip: &str, page: Page) -> Result<ReverseHits> {
        self.submit_reverse(ReverseQuery::new(ip, ReverseScope::Address, page))?
            .wait()
    }

    /// Hostnames recorded for a CIDR block.
    pub fn reverse_range(&self, cidr: &str, page: Page) -> Result<ReverseHits> {
        self.submit_reverse(ReverseQuery::new(cidr, ReverseScope::Range, page))?
            .wait()
    }
}
