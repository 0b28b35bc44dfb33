//! Shared fixtures: sorted datasets on disk plus indices built over them.

#![allow(dead_code)]

use sonarsearch::{Engine, MemoryIndex};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Render `key:::offset` lines for every key change,
/// keyed by the first field of each record.
pub fn index_lines(data: &str, key: impl Fn(&str) -> String) -> String {
    let mut out = String::new();
    let mut current = String::new();
    let mut pos = 0usize;
    for line in data.split_inclusive('\n') {
        let k = key(line.split(',').next().unwrap_or(""));
        if k != current {
            out.push_str(&format!("{}:::{}\n", k, pos));
            current = k;
        }
        pos += line.len();
    }
    out
}

pub struct Fixture {
    pub dir: TempDir,
    pub engine: Arc<Engine>,
}

/// Lay out both datasets and their index files, then load them the way a
/// server would.
pub fn fixture(domains: &str, reverse: &str, bucket_size: u32) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = |name: &str| dir.path().join(name);

    std::fs::write(path("domains.csv"), domains).unwrap();
    std::fs::write(path("reverse.csv"), reverse).unwrap();
    std::fs::write(
        path("domains.idx"),
        index_lines(domains, |domain| domain.to_string()),
    )
    .unwrap();
    std::fs::write(
        path("reverse.idx"),
        index_lines(reverse, |ip| {
            (ip.parse::<u32>().unwrap() / bucket_size).to_string()
        }),
    )
    .unwrap();

    let engine = engine_from(dir.path(), bucket_size);
    Fixture {
        dir,
        engine: Arc::new(engine),
    }
}

pub fn engine_from(dir: &Path, bucket_size: u32) -> Engine {
    let domain_index = MemoryIndex::load(&dir.join("domains.idx")).unwrap();
    let reverse_index = MemoryIndex::load(&dir.join("reverse.idx")).unwrap();
    Engine::new(
        dir.join("domains.csv"),
        Arc::new(domain_index),
        dir.join("reverse.csv"),
        Arc::new(reverse_index),
    )
    .with_bucket_size(bucket_size)
}

/// A larger sorted domain dataset: `count` domains, each under two
/// suffixes with a handful of subdomains.
pub fn generated_domains(count: usize) -> String {
    let mut out = String::from("aaa,com,\n");
    for i in 0..count {
        let domain = format!("d{:05}", i);
        for tld in ["com", "net"] {
            out.push_str(&format!("{},{},\n", domain, tld));
            for sub in 0..(i % 4) {
                out.push_str(&format!("{},{},s{}\n", domain, tld, sub));
            }
        }
    }
    out
}

/// A larger sorted reverse dataset starting at 10.0.0.0, every third
/// address, with a second hostname on every fifth one.
pub fn generated_reverse(count: u32) -> String {
    let base = 0x0A00_0000u32;
    // Keeps the first real bucket off offset zero
    let mut out = String::from("1,sentinel.example.com\n");
    for i in 0..count {
        let ip = base + i * 3;
        out.push_str(&format!("{},h{}.example.com\n", ip, i));
        if i % 5 == 0 {
            out.push_str(&format!("{},alias{}.example.com\n", ip, i));
        }
    }
    out
}
