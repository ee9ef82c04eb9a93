//! Crawler scenarios: a mock site crawled into the sync pipeline.

use parking_lot::Mutex;
use reqwest::Url;

use quarry::crawler::fetch::FetchedPage;
use quarry::crawler::{CrawlerConfig, Fetcher, WebCrawlerLoader};
use quarry::error::Result;
use quarry::keyword::KeywordIndex;
use quarry::loader::{DocumentLoader, LoadResult, LoadStats};
use quarry::registry::InMemoryRegistry;
use quarry::sync::SyncEngine;

/// A canned site: URL -> HTML body, with a log of fetched URLs.
struct FakeSite {
    pages: Vec<(String, String)>,
    log: Mutex<Vec<String>>,
}

impl FakeSite {
    fn new(pages: &[(&str, &str)]) -> Self {
        FakeSite {
            pages: pages
                .iter()
                .map(|(u, b)| (u.to_string(), b.to_string()))
                .collect(),
            log: Mutex::new(Vec::new()),
        }
    }

    fn fetched(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl Fetcher for &'static FakeSite {
    fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        self.log.lock().push(url.as_str().to_string());
        match self.pages.iter().find(|(u, _)| u == url.as_str()) {
            Some((_, body)) => Ok(FetchedPage {
                final_url: url.clone(),
                status: 200,
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: body.clone(),
            }),
            None => Ok(FetchedPage {
                final_url: url.clone(),
                status: 404,
                content_type: None,
                body: String::new(),
            }),
        }
    }
}

fn site(pages: &[(&str, &str)]) -> &'static FakeSite {
    Box::leak(Box::new(FakeSite::new(pages)))
}

fn config(seeds: &[&str]) -> CrawlerConfig {
    CrawlerConfig {
        seeds: seeds.iter().map(|s| s.to_string()).collect(),
        delay_ms: 0,
        respect_robots_txt: false,
        ..Default::default()
    }
}

#[test]
fn test_crawl_feeds_sync_and_reindexes_only_changes() -> Result<()> {
    let fake = site(&[
        (
            "https://docs.example.com/",
            r#"<title>Docs Home</title><p>welcome to the documentation</p>
               <a href="/install">install</a>"#,
        ),
        (
            "https://docs.example.com/install",
            "<title>Install</title><p>installation steps</p>",
        ),
    ]);
    let loader = WebCrawlerLoader::with_fetcher(config(&["https://docs.example.com/"]), Box::new(fake));

    let registry = InMemoryRegistry::new();
    let keyword = KeywordIndex::with_defaults();
    let engine = SyncEngine::new(&registry, &keyword);

    let stats = engine.sync(&loader)?;
    assert_eq!(stats.added, 2);

    // The site did not change, so a re-crawl syncs to all-unchanged.
    let stats = engine.sync(&loader)?;
    assert_eq!(stats.unchanged, 2);
    assert_eq!(stats.added + stats.updated + stats.deleted, 0);

    // Crawled pages are searchable with their metadata intact.
    let matches = keyword.search("installation", 10, None)?;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "https://docs.example.com/install");
    let doc = keyword.get(&matches[0].id)?.unwrap();
    assert_eq!(doc.metadata.get("title").map(String::as_str), Some("Install"));
    Ok(())
}

#[test]
fn test_single_page_config_never_follows_links() {
    let fake = site(&[(
        "https://example.com/",
        r#"<a href="/one">1</a><a href="/two">2</a><a href="/three">3</a>"#,
    )]);
    let mut cfg = CrawlerConfig::single_page("https://example.com/");
    cfg.delay_ms = 0;
    cfg.respect_robots_txt = false;
    let loader = WebCrawlerLoader::with_fetcher(cfg, Box::new(fake));

    let stats = LoadStats::collect(loader.load());

    assert_eq!(stats.loaded, 1);
    assert_eq!(fake.fetched(), vec!["https://example.com/".to_string()]);
}

#[test]
fn test_blocked_metadata_address_fails_without_network() {
    let fake = site(&[]);
    let loader = WebCrawlerLoader::with_fetcher(
        config(&["http://169.254.169.254/latest/meta-data/iam/"]),
        Box::new(fake),
    );

    let results: Vec<LoadResult> = loader.load().collect();

    assert!(fake.fetched().is_empty(), "no network call may be issued");
    match &results[0] {
        LoadResult::Failure { error, .. } => {
            let msg = error.to_string();
            assert!(msg.contains("blocked range"), "got: {msg}");
            assert!(msg.contains("169.254.0.0/16"), "got: {msg}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_blocked_discovered_link_is_rejected_midcrawl() {
    let fake = site(&[(
        "https://example.com/",
        r#"<a href="http://169.254.169.254/secrets">metadata</a>"#,
    )]);
    let mut cfg = config(&["https://example.com/"]);
    cfg.same_domain_only = false;
    let loader = WebCrawlerLoader::with_fetcher(cfg, Box::new(fake));

    let stats = LoadStats::collect(loader.load());

    assert_eq!(stats.loaded, 1);
    assert_eq!(stats.failed, 1);
    assert!(stats.errors[0].1.contains("blocked range"));
    // Only the legitimate page was actually fetched.
    assert_eq!(fake.fetched(), vec!["https://example.com/".to_string()]);
}

#[test]
fn test_robots_txt_is_fetched_once_per_host_and_honored() {
    struct RobotsSite {
        log: Mutex<Vec<String>>,
    }
    impl Fetcher for &'static RobotsSite {
        fn fetch(&self, url: &Url) -> Result<FetchedPage> {
            self.log.lock().push(url.as_str().to_string());
            let body = if url.path() == "/robots.txt" {
                "User-agent: *\nDisallow: /hidden/\n".to_string()
            } else {
                format!(r#"<a href="/hidden/a">h</a><a href="/open">o</a> page at {url}"#)
            };
            Ok(FetchedPage {
                final_url: url.clone(),
                status: 200,
                content_type: Some("text/html".to_string()),
                body,
            })
        }
    }

    let robots_site: &'static RobotsSite = Box::leak(Box::new(RobotsSite {
        log: Mutex::new(Vec::new()),
    }));
    let mut cfg = config(&["https://example.com/"]);
    cfg.respect_robots_txt = true;
    let loader = WebCrawlerLoader::with_fetcher(cfg, Box::new(robots_site));

    let stats = LoadStats::collect(loader.load());

    assert!(stats.skipped >= 1, "the /hidden/ page must be skipped");
    let log = robots_site.log.lock();
    let robots_fetches = log.iter().filter(|u| u.ends_with("/robots.txt")).count();
    assert_eq!(robots_fetches, 1, "robots.txt is cached per host");
    assert!(!log.iter().any(|u| u.contains("/hidden/")));
}
