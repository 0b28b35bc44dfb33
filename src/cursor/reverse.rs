//! Reverse dataset records, the integer-range needle and grouped results.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{Needle, Verdict};
use crate::ipconv::int_to_ip;
use crate::{Error, Result};

/// One `ipInt,hostname` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseRecord<'a> {
    pub ip: u32,
    pub domain: &'a str,
}

impl<'a> ReverseRecord<'a> {
    /// Parse a dataset line.
    pub fn parse(line: &'a str) -> Result<Self> {
        let (ip, domain) = line
            .split_once(',')
            .ok_or_else(|| Error::MalformedRecord(line.to_string()))?;
        let ip = ip
            .parse::<u32>()
            .map_err(|_| Error::MalformedRecord(line.to_string()))?;
        Ok(Self { ip, domain })
    }
}

/// A reconstructed reverse match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseMatch {
    /// Dotted-quad address
    pub ip: String,
    pub domain: String,
}

/// Inclusive integer-range needle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReverseNeedle {
    pub min: u32,
    pub max: u32,
}

impl ReverseNeedle {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }
}

impl Needle for ReverseNeedle {
    type Item = ReverseMatch;
    type Output = ReverseHits;

    fn test(&mut self, line: &str) -> Result<Verdict<ReverseMatch>> {
        if line.is_empty() {
            return Ok(Verdict::Miss);
        }

        let record = ReverseRecord::parse(line)?;
        if record.ip < self.min {
            Ok(Verdict::Miss)
        } else if record.ip > self.max {
            Ok(Verdict::Past)
        } else {
            Ok(Verdict::Hit(ReverseMatch {
                ip: int_to_ip(record.ip),
                domain: record.domain.to_string(),
            }))
        }
    }
}

/// Hostnames grouped by address, in scan order.
///
/// Serialises as a JSON object mapping each address to its hostnames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseHits {
    entries: Vec<(String, Vec<String>)>,
}

impl ReverseHits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hostnames recorded for `ip`.
    pub fn get(&self, ip: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(addr, _)| addr == ip)
            .map(|(_, hosts)| hosts.as_slice())
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total hostnames across all addresses.
    pub fn hostname_count(&self) -> usize {
        self.entries.iter().map(|(_, hosts)| hosts.len()).sum()
    }

    /// Addresses in scan order.
    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(addr, _)| addr.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(addr, hosts)| (addr.as_str(), hosts.as_slice()))
    }

    /// Append one match.
    pub fn push(&mut self, hit: ReverseMatch) {
        // Records are sorted by address, so a repeat is almost always the last group
        if let Some((addr, hosts)) = self.entries.last_mut() {
            if *addr == hit.ip {
                hosts.push(hit.domain);
                return;
            }
        }
        match self.entries.iter_mut().find(|(addr, _)| *addr == hit.ip) {
            Some((_, hosts)) => hosts.push(hit.domain),
            None => self.entries.push((hit.ip, vec![hit.domain])),
        }
    }
}

impl Extend<ReverseMatch> for ReverseHits {
    fn extend<I: IntoIterator<Item = ReverseMatch>>(&mut self, iter: I) {
        for hit in iter {
            self.push(hit);
        }
    }
}

impl FromIterator<ReverseMatch> for ReverseHits {
    fn from_iter<I: IntoIterator<Item = ReverseMatch>>(iter: I) -> Self {
        let mut hits = Self::new();
        hits.extend(iter);
        hits
    }
}

impl Serialize for ReverseHits {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (addr, hosts) in &self.entries {
            map.serialize_entry(addr, hosts)?;
        }
        map.end()
    }
}
