//! Many callers against small worker pools, checked against the engine
//! run directly on one thread.

mod common;

use common::{fixture, generated_domains, generated_reverse};
use sonarsearch::{DomainMode, DomainQuery, Error, Page, ReverseQuery, ReverseScope, SearchService};
use std::sync::Arc;
use std::thread;

const WORKERS: usize = 3;

#[test]
fn test_concurrent_queries_match_single_threaded_reference() {
    let fx = fixture(&generated_domains(200), &generated_reverse(2000), 10);
    let service = Arc::new(SearchService::new(Arc::clone(&fx.engine), WORKERS, 1).unwrap());

    let domain_queries: Vec<DomainQuery> = (0..30)
        .map(|i| {
            let mode = match i % 3 {
                0 => DomainMode::Subdomains,
                1 => DomainMode::All,
                _ => DomainMode::Tlds,
            };
            DomainQuery::new(format!("d{:05}.com", i * 6 + 1), mode, Page::new(i % 2, 5))
        })
        .collect();
    let reverse_queries: Vec<ReverseQuery> = (0..30u32)
        .map(|i| {
            if i % 2 == 0 {
                let ip = format!("10.0.{}.{}", i / 4, (i * 3) % 256);
                ReverseQuery::new(ip, ReverseScope::Address, Page::default())
            } else {
                let cidr = format!("10.0.{}.0/24", i % 20);
                ReverseQuery::new(cidr, ReverseScope::Range, Page::new(1, 10))
            }
        })
        .collect();

    // K callers well beyond the pool size
    let domain_handles: Vec<_> = domain_queries
        .iter()
        .cloned()
        .map(|query| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.submit_domain(query).unwrap().wait())
        })
        .collect();
    let reverse_handles: Vec<_> = reverse_queries
        .iter()
        .cloned()
        .map(|query| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.submit_reverse(query).unwrap().wait())
        })
        .collect();

    for (query, handle) in domain_queries.iter().zip(domain_handles) {
        let got = handle.join().unwrap();
        let expected = fx.engine.search_domains(&query.query, query.mode, query.page);
        assert_eq!(format!("{:?}", got), format!("{:?}", expected), "{:?}", query);
    }
    for (query, handle) in reverse_queries.iter().zip(reverse_handles) {
        let got = handle.join().unwrap();
        let expected = match query.scope {
            ReverseScope::Address => fx.engine.reverse_lookup(&query.query, query.page),
            ReverseScope::Range => fx.engine.reverse_range(&query.query, query.page),
        };
        assert_eq!(format!("{:?}", got), format!("{:?}", expected), "{:?}", query);
    }

    let domains = service.domain_dispatcher().stats();
    let reverse = service.reverse_dispatcher().stats();
    assert_eq!(domains.served() + domains.failed(), 30);
    assert_eq!(reverse.served() + reverse.failed(), 30);
}

#[test]
fn test_failures_do_not_stall_the_pool() {
    let fx = fixture(&generated_domains(20), &generated_reverse(100), 10);
    let service = Arc::new(SearchService::new(Arc::clone(&fx.engine), 2, 1).unwrap());

    let handles: Vec<_> = (0..24)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || match i % 4 {
                0 => service.subdomains("", Page::default()).map(|_| ()),
                1 => service.subdomains("missing.com", Page::default()).map(|_| ()),
                2 => service.reverse_lookup("not-an-ip", Page::default()).map(|_| ()),
                _ => service.subdomains("d00005.com", Page::default()).map(|_| ()),
            })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(()) => ok += 1,
            Err(Error::BlankQuery) | Err(Error::NotFound(_)) | Err(Error::InvalidAddress(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(ok, 6);
    assert_eq!(
        service.subdomains("d00005.com", Page::first(1)).unwrap(),
        vec!["d00005.com"]
    );
}
