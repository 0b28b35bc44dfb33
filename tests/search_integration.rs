//! End-to-end queries over on-disk datasets and index files.

mod common;

use common::{fixture, generated_domains, generated_reverse, index_lines};
use sonarsearch::cursor::DomainNeedle;
use sonarsearch::{
    DomainMode, DomainParser, EngineConfig, Error, IndexSource, NeedleKind, Page, RangeScanCursor,
    ScanState, SearchService,
};
use std::io::Write;

const DOMAINS: &str = "\
aaa,com,\n\
acme,com,mail\n\
acme,com,www\n\
acme,net,\n\
zulu,org,\n";

const REVERSE: &str = "\
1,sentinel.example.com\n\
16909060,foo.example.com\n\
16909061,bar.example.com\n";

#[test]
fn test_subdomains_worked_example() {
    let fx = fixture(DOMAINS, REVERSE, 1000);
    let hosts = fx.engine.subdomains("acme.com", Page::default()).unwrap();
    assert_eq!(hosts, vec!["mail.acme.com", "www.acme.com"]);
}

#[test]
fn test_scan_stops_at_first_line_past_range() {
    let fx = fixture(DOMAINS, REVERSE, 1000);
    let parsed = DomainParser::new().parse("acme.com").unwrap();
    let needle = DomainNeedle::new(&parsed, NeedleKind::FullDomain);
    assert_eq!(needle.prefix(), "acme,com,");

    // "aaa,com,\n" is 9 bytes
    let path = fx.dir.path().join("domains.csv");
    let mut cursor = RangeScanCursor::open(&path, 9, needle, "acme.com").unwrap();

    assert!(cursor.next());
    assert_eq!(cursor.state(), ScanState::Matching);
    assert_eq!(cursor.current().map(String::as_str), Some("mail.acme.com"));
    assert!(cursor.next());
    assert_eq!(cursor.current().map(String::as_str), Some("www.acme.com"));
    assert!(!cursor.next());
    assert_eq!(cursor.state(), ScanState::Exhausted);
    assert!(cursor.error().is_none());

    // Terminal states stay terminal
    assert!(!cursor.next());
    cursor.close();
    cursor.close();
}

#[test]
fn test_reverse_worked_example() {
    let fx = fixture(DOMAINS, REVERSE, 1000);
    let hits = fx.engine.reverse_lookup("1.2.3.4", Page::default()).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits.get("1.2.3.4").unwrap(), &["foo.example.com".to_string()]);

    let json = serde_json::to_string(&hits).unwrap();
    assert_eq!(json, r#"{"1.2.3.4":["foo.example.com"]}"#);
}

#[test]
fn test_single_address_matches_slash_32() {
    let fx = fixture(DOMAINS, REVERSE, 1000);
    for ip in ["1.2.3.4", "1.2.3.5"] {
        let single = fx.engine.reverse_lookup(ip, Page::default()).unwrap();
        let block = fx
            .engine
            .reverse_range(&format!("{}/32", ip), Page::default())
            .unwrap();
        assert_eq!(single, block, "{}", ip);
    }
}

#[test]
fn test_absent_domain_is_not_found() {
    let fx = fixture(DOMAINS, REVERSE, 1000);
    for query in ["nothing.com", "acmf.com", "aaaa.net"] {
        assert!(
            matches!(
                fx.engine.subdomains(query, Page::default()),
                Err(Error::NotFound(_))
            ),
            "{}",
            query
        );
    }
}

#[test]
fn test_skip_take_matches_full_scan() {
    let domains = generated_domains(50);
    let reverse = generated_reverse(400);
    let fx = fixture(&domains, &reverse, 10);

    for mode in [DomainMode::Subdomains, DomainMode::All, DomainMode::Tlds] {
        let full = fx
            .engine
            .search_domains("d00007.com", mode, Page::unbounded())
            .unwrap();
        assert!(!full.is_empty());

        for (skip, take) in [(0, 1), (1, 2), (2, 100), (5, 3), (100, 5)] {
            let page = fx
                .engine
                .search_domains("d00007.com", mode, Page::new(skip, take))
                .unwrap();
            assert!(page.len() <= take);
            let expected: Vec<String> = full.iter().skip(skip).take(take).cloned().collect();
            assert_eq!(page, expected, "{:?} skip {} take {}", mode, skip, take);
        }
    }

    let full = fx
        .engine
        .reverse_range("10.0.0.0/22", Page::unbounded())
        .unwrap();
    let pairs: Vec<(String, String)> = full
        .iter()
        .flat_map(|(ip, hosts)| hosts.iter().map(move |h| (ip.to_string(), h.clone())))
        .collect();
    for (skip, take) in [(0, 7), (13, 20), (200, 1000)] {
        let page = fx
            .engine
            .reverse_range("10.0.0.0/22", Page::new(skip, take))
            .unwrap();
        assert!(page.hostname_count() <= take);
        let got: Vec<(String, String)> = page
            .iter()
            .flat_map(|(ip, hosts)| hosts.iter().map(move |h| (ip.to_string(), h.clone())))
            .collect();
        let expected: Vec<(String, String)> =
            pairs.iter().skip(skip).take(take).cloned().collect();
        assert_eq!(got, expected, "skip {} take {}", skip, take);
    }
}

#[test]
fn test_tlds_lists_each_variant_once() {
    let domains = generated_domains(10);
    let fx = fixture(&domains, REVERSE, 1000);
    assert_eq!(
        fx.engine.tlds("d00003.com", Page::default()).unwrap(),
        vec!["d00003.com", "d00003.net"]
    );
    assert_eq!(
        fx.engine.all("d00003.com", Page::default()).unwrap().len(),
        8
    );
}

#[test]
fn test_from_config_with_gzipped_index() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let fx = fixture(DOMAINS, REVERSE, 1000);
    let dir = fx.dir.path();

    let gz_path = dir.join("domains.idx.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&gz_path).unwrap(), Compression::default());
    encoder
        .write_all(index_lines(DOMAINS, |d| d.to_string()).as_bytes())
        .unwrap();
    encoder.finish().unwrap();

    let yaml = format!(
        r#"
domain_file: {dir}/domains.csv
reverse_file: {dir}/reverse.csv
domain_index:
  backend: file
  path: {dir}/domains.idx.gz
reverse_index:
  backend: file
  path: {dir}/reverse.idx
workers: 2
reverse_bucket_size: 1000
"#,
        dir = dir.display()
    );
    let config_path = dir.join("sonarsearch.yaml");
    std::fs::write(&config_path, yaml).unwrap();

    let config = EngineConfig::load(&config_path).unwrap();
    assert!(matches!(config.domain_index, IndexSource::File { .. }));

    let service = SearchService::from_config(&config).unwrap();
    assert_eq!(service.domain_dispatcher().worker_count(), 2);
    assert_eq!(
        service.subdomains("www.acme.com", Page::default()).unwrap(),
        vec!["mail.acme.com", "www.acme.com"]
    );
    assert_eq!(
        service
            .reverse_lookup("1.2.3.5", Page::default())
            .unwrap()
            .get("1.2.3.5")
            .unwrap(),
        &["bar.example.com".to_string()]
    );
}

#[test]
fn test_from_config_missing_index_file() {
    let config = EngineConfig {
        domain_index: IndexSource::File {
            path: "/nonexistent/domains.idx".into(),
        },
        ..EngineConfig::default()
    };
    assert!(matches!(
        SearchService::from_config(&config),
        Err(Error::Io(_))
    ));
}

#[test]
fn test_missing_suffix_stops_at_first_later_record() {
    let mut domains = String::from("aaa,com,\nacme,com,www\n");
    for i in 0..200_000 {
        domains.push_str(&format!("b{:07},com,\n", i));
    }
    // Out of order on purpose: only reachable by scanning the whole tail
    domains.push_str("acme,dev,late\n");

    let fx = fixture(&domains, REVERSE, 1000);
    let hosts = fx.engine.subdomains("acme.dev", Page::default()).unwrap();
    assert!(hosts.is_empty(), "{:?}", hosts);

    // The indexed suffix is still served
    assert_eq!(
        fx.engine.subdomains("acme.com", Page::default()).unwrap(),
        vec!["www.acme.com"]
    );
}
