//! Query-domain parsing and needle selection.
//!
//! Domain records are stored as `domain,tld,subdomain`, so a raw query such as
//! `www.acme.co.uk` has to be split on its public suffix before it can be
//! turned into an index key (`acme`) and a needle (`acme,co.uk,`).

use ahash::AHashSet;
use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// Multi-label public suffixes recognised without a suffix list file.
const BUILTIN_SUFFIXES: &[&str] = &[
    "ac.uk", "co.uk", "gov.uk", "ltd.uk", "me.uk", "net.uk", "org.uk", "plc.uk", "sch.uk",
    "com.au", "edu.au", "gov.au", "net.au", "org.au", "asn.au", "id.au",
    "co.nz", "govt.nz", "net.nz", "org.nz", "ac.nz",
    "co.jp", "ne.jp", "or.jp", "ac.jp", "go.jp",
    "co.kr", "or.kr", "ne.kr",
    "com.br", "net.br", "org.br", "gov.br",
    "com.cn", "net.cn", "org.cn", "gov.cn", "edu.cn",
    "com.hk", "org.hk", "net.hk",
    "com.tw", "org.tw", "net.tw",
    "com.sg", "edu.sg", "gov.sg",
    "co.in", "net.in", "org.in", "gov.in", "ac.in",
    "co.za", "org.za", "gov.za",
    "com.mx", "org.mx", "gob.mx",
    "com.ar", "com.tr", "com.ru", "com.ua", "com.pl", "co.il", "co.id", "com.my",
];

static DEFAULT_SUFFIXES: Lazy<AHashSet<String>> =
    Lazy::new(|| BUILTIN_SUFFIXES.iter().map(|s| s.to_string()).collect());

/// Which part of a parsed query the needle pins down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeedleKind {
    /// `"<domain>,<tld>,"`: one registered domain, every subdomain.
    FullDomain,
    /// `"<domain>,"`: the domain label under every public suffix.
    DomainOnly,
}

/// A query split into its record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDomain {
    pub subdomain: String,
    pub domain: String,
    pub tld: String,
}

impl ParsedDomain {
    /// The key the domain index is keyed by.
    pub fn index_key(&self) -> &str {
        &self.domain
    }

    /// Build the line prefix a matching record starts with.
    pub fn needle(&self, kind: NeedleKind) -> String {
        match kind {
            NeedleKind::FullDomain => format!("{},{},", self.domain, self.tld),
            NeedleKind::DomainOnly => format!("{},", self.domain),
        }
    }

    /// `domain.tld`, or just `domain` when there is no suffix.
    pub fn registered(&self) -> String {
        if self.tld.is_empty() {
            self.domain.clone()
        } else {
            format!("{}.{}", self.domain, self.tld)
        }
    }
}

/// Splits hostnames into subdomain, registered label and public suffix.
///
/// The suffix is the longest known multi-label suffix matching the tail of
/// the name, falling back to the last label.
#[derive(Debug, Clone)]
pub struct DomainParser {
    suffixes: AHashSet<String>,
}

impl Default for DomainParser {
    fn default() -> Self {
        Self {
            suffixes: DEFAULT_SUFFIXES.clone(),
        }
    }
}

impl DomainParser {
    /// Create a parser with the built-in suffix table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the built-in table with a Mozilla public suffix list file.
    pub fn with_suffix_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut parser = Self::default();
        let before = parser.suffixes.len();
        parser.add_suffix_list(&content);
        log::info!(
            "Loaded {} public suffixes from {:?}",
            parser.suffixes.len() - before,
            path
        );
        Ok(parser)
    }

    /// Add rules from public-suffix-list text.
    ///
    /// Wildcard (`*.`) and exception (`!`) rules are skipped; only plain
    /// suffixes are recorded.
    pub fn add_suffix_list(&mut self, content: &str) {
        for line in content.lines() {
            let rule = line.split_whitespace().next().unwrap_or("");
            if rule.is_empty() || rule.starts_with("//") || rule.starts_with('!') || rule.starts_with('*') {
                continue;
            }
            self.suffixes.insert(rule.to_lowercase());
        }
    }

    /// Number of known suffixes.
    pub fn suffix_count(&self) -> usize {
        self.suffixes.len()
    }

    /// Parse a raw query.
    ///
    /// # Examples
    /// ```
    /// use sonarsearch::domain::DomainParser;
    ///
    /// let parsed = DomainParser::new().parse("www.Acme.co.uk.").unwrap();
    /// assert_eq!(parsed.subdomain, "www");
    /// assert_eq!(parsed.domain, "acme");
    /// assert_eq!(parsed.tld, "co.uk");
    /// ```
    pub fn parse(&self, query: &str) -> Result<ParsedDomain> {
        let name = query.trim().trim_end_matches('.').to_lowercase();
        if name.is_empty() {
            return Err(Error::BlankQuery);
        }

        let labels: Vec<&str> = name.split('.').collect();
        if labels.len() == 1 {
            return Ok(ParsedDomain {
                subdomain: String::new(),
                domain: name,
                tld: String::new(),
            });
        }

        // Longest suffix that still leaves a registrable label in front
        let mut suffix_labels = 1;
        for start in 1..labels.len() - 1 {
            let candidate = labels[start..].join(".");
            if self.suffixes.contains(&candidate) {
                suffix_labels = labels.len() - start;
                break;
            }
        }

        let domain_pos = labels.len() - suffix_labels - 1;
        Ok(ParsedDomain {
            subdomain: labels[..domain_pos].join("."),
            domain: labels[domain_pos].to_string(),
            tld: labels[domain_pos + 1..].join("."),
        })
    }
}
