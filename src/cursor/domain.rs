//! Domain dataset records and the prefix needle.

use super::{Needle, Verdict};
use crate::domain::{NeedleKind, ParsedDomain};
use crate::{Error, Result};

/// One `domain,tld,subdomain` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord<'a> {
    pub domain: &'a str,
    pub tld: &'a str,
    pub subdomain: &'a str,
}

impl<'a> DomainRecord<'a> {
    /// Parse a dataset line. The subdomain field may be empty.
    pub fn parse(line: &'a str) -> Result<Self> {
        let mut fields = line.splitn(3, ',');
        match (fields.next(), fields.next(), fields.next()) {
            (Some(domain), Some(tld), Some(subdomain)) if !domain.is_empty() => Ok(Self {
                domain,
                tld,
                subdomain,
            }),
            _ => Err(Error::MalformedRecord(line.to_string())),
        }
    }

    /// `subdomain.domain.tld`, or `domain.tld` without a subdomain.
    pub fn fqdn(&self) -> String {
        if self.subdomain.is_empty() {
            format!("{}.{}", self.domain, self.tld)
        } else {
            format!("{}.{}.{}", self.subdomain, self.domain, self.tld)
        }
    }

    /// `domain.tld`.
    pub fn registered(&self) -> String {
        format!("{}.{}", self.domain, self.tld)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    Fqdn,
    Registered,
}

/// Exact-prefix needle over domain records.
#[derive(Debug, Clone)]
pub struct DomainNeedle {
    prefix: String,
    emit: Emit,
    last: Option<String>,
}

impl DomainNeedle {
    /// Match records under `parsed`, producing full hostnames.
    pub fn new(parsed: &ParsedDomain, kind: NeedleKind) -> Self {
        Self {
            prefix: parsed.needle(kind),
            emit: Emit::Fqdn,
            last: None,
        }
    }

    /// Match every record of the domain label, producing each distinct
    /// `domain.tld` once.
    pub fn tld_variants(parsed: &ParsedDomain) -> Self {
        Self {
            prefix: parsed.needle(NeedleKind::DomainOnly),
            emit: Emit::Registered,
            last: None,
        }
    }

    /// The line prefix matching records start with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Needle for DomainNeedle {
    type Item = String;
    type Output = Vec<String>;

    fn test(&mut self, line: &str) -> Result<Verdict<String>> {
        if !line.starts_with(&self.prefix) {
            // `,` sorts below every hostname byte, so field order is byte order
            return Ok(if line > self.prefix.as_str() {
                Verdict::Past
            } else {
                Verdict::Miss
            });
        }

        let record = DomainRecord::parse(line)?;
        match self.emit {
            Emit::Fqdn => Ok(Verdict::Hit(record.fqdn())),
            Emit::Registered => {
                let registered = record.registered();
                // (domain, tld) runs are contiguous, so comparing with the
                // previous variant is enough to deduplicate
                if self.last.as_deref() == Some(registered.as_str()) {
                    return Ok(Verdict::Repeat);
                }
                self.last = Some(registered.clone());
                Ok(Verdict::Hit(registered))
            }
        }
    }
}
