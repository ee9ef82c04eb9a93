//! The BFS crawl scheduler, exposed as a [`DocumentLoader`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ahash::{AHashMap, AHashSet};
use reqwest::Url;
use tracing::{debug, warn};

use crate::crawler::config::{CrawlerConfig, UrlPatterns};
use crate::crawler::extract::HtmlExtractor;
use crate::crawler::fetch::{Fetcher, HttpFetcher, check_blocked_address};
use crate::crawler::robots::RobotsCache;
use crate::document::{Document, DocumentVersion};
use crate::error::{QuarryError, Result};
use crate::loader::{DocumentLoader, LoadResult};

/// A breadth-first web crawl implementing [`DocumentLoader`].
///
/// Each call to `load` starts a fresh crawl from the configured seeds.
/// Per-page outcomes stream lazily: accepted pages become `Success`
/// documents, rejected content types and robots denials become
/// `Skipped`, and fetch errors or blocked addresses become `Failure`;
/// none of these stop the crawl. All caches (robots policies, compiled
/// patterns) live on the instance, never in process-wide state.
pub struct WebCrawlerLoader {
    config: CrawlerConfig,
    fetcher: Box<dyn Fetcher>,
}

impl WebCrawlerLoader {
    /// Create a crawler using the real HTTP fetcher.
    pub fn new(config: CrawlerConfig) -> Result<Self> {
        if config.seeds.is_empty() {
            return Err(QuarryError::configuration("crawler needs at least one seed URL"));
        }
        // Fail fast on bad patterns instead of at first load().
        config.compile_patterns()?;
        let fetcher = HttpFetcher::new(config.timeout_ms, &config.user_agent)?;
        Ok(WebCrawlerLoader {
            config,
            fetcher: Box::new(fetcher),
        })
    }

    /// Create a crawler with an injected fetcher (tests, recording).
    pub fn with_fetcher(config: CrawlerConfig, fetcher: Box<dyn Fetcher>) -> Self {
        WebCrawlerLoader { config, fetcher }
    }
}

impl DocumentLoader for WebCrawlerLoader {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        match CrawlIter::start(&self.config, self.fetcher.as_ref()) {
            Ok(iter) => Box::new(iter),
            Err(error) => Box::new(std::iter::once(LoadResult::Failure {
                source: self.description(),
                error,
            })),
        }
    }

    fn description(&self) -> String {
        format!("web crawl of {}", self.config.seeds.join(", "))
    }

    fn estimated_count(&self) -> Option<usize> {
        // Unknowable before the crawl runs.
        None
    }
}

struct CrawlIter<'a> {
    config: &'a CrawlerConfig,
    fetcher: &'a dyn Fetcher,
    patterns: UrlPatterns,
    extractor: HtmlExtractor,
    robots: RobotsCache,
    frontier: VecDeque<(Url, usize)>,
    /// URLs ever enqueued, for dedup.
    visited: AHashSet<String>,
    /// Pre-computed failures for unparsable seeds.
    pending: VecDeque<LoadResult>,
    /// host -> completion time of the last fetch to it.
    last_fetch: AHashMap<String, Instant>,
    seed_domains: AHashSet<String>,
    pages_fetched: usize,
}

impl<'a> CrawlIter<'a> {
    fn start(config: &'a CrawlerConfig, fetcher: &'a dyn Fetcher) -> Result<Self> {
        let patterns = config.compile_patterns()?;
        let extractor = HtmlExtractor::new()?;

        let mut frontier = VecDeque::new();
        let mut visited = AHashSet::new();
        let mut pending = VecDeque::new();
        let mut seed_domains = AHashSet::new();

        for seed in &config.seeds {
            match Url::parse(seed) {
                Ok(url) => {
                    if let Some(host) = url.host_str() {
                        seed_domains.insert(base_domain(host));
                    }
                    if visited.insert(url.as_str().to_string()) {
                        frontier.push_back((url, 0));
                    }
                }
                Err(e) => pending.push_back(LoadResult::Failure {
                    source: seed.clone(),
                    error: QuarryError::configuration(format!("invalid seed URL: {e}")),
                }),
            }
        }

        Ok(CrawlIter {
            config,
            fetcher,
            patterns,
            extractor,
            robots: RobotsCache::new(config.user_agent.clone()),
            frontier,
            visited,
            pending,
            last_fetch: AHashMap::new(),
            seed_domains,
            pages_fetched: 0,
        })
    }

    /// Enforce the per-host politeness delay before the next fetch.
    fn wait_for_host(&self, host: &str) {
        if self.config.delay_ms == 0 {
            return;
        }
        if let Some(last) = self.last_fetch.get(host) {
            let min_gap = Duration::from_millis(self.config.delay_ms);
            let elapsed = last.elapsed();
            if elapsed < min_gap {
                std::thread::sleep(min_gap - elapsed);
            }
        }
    }

    fn enqueue_links(&mut self, links: Vec<Url>, depth: usize) {
        for link in links {
            if self.visited.contains(link.as_str()) {
                continue;
            }
            if self.config.same_domain_only {
                let in_domain = link
                    .host_str()
                    .map(|h| self.seed_domains.contains(&base_domain(h)))
                    .unwrap_or(false);
                if !in_domain {
                    debug!(url = %link, "off-domain link discarded");
                    continue;
                }
            }
            if !self.patterns.allows(link.as_str()) {
                debug!(url = %link, "link rejected by patterns");
                continue;
            }
            if self.frontier.len() >= self.config.max_queue_size {
                debug!(url = %link, "frontier full, link dropped");
                continue;
            }
            self.visited.insert(link.as_str().to_string());
            self.frontier.push_back((link, depth + 1));
        }
    }

    fn crawl_one(&mut self, url: Url, depth: usize) -> LoadResult {
        let source = url.as_str().to_string();

        // SSRF control runs before any network activity for this URL.
        if let Err(error) = check_blocked_address(&url) {
            warn!(%source, %error, "blocked address rejected");
            return LoadResult::Failure { source, error };
        }

        let host = url.host_str().unwrap_or_default().to_string();
        self.wait_for_host(&host);

        if self.config.respect_robots_txt {
            // The robots GET counts against the same per-host throttle
            // as the page GET that follows it.
            if self.robots.prepare(self.fetcher, &url) {
                self.last_fetch.insert(host.clone(), Instant::now());
                self.wait_for_host(&host);
            }
            if !self.robots.allows(&url) {
                return LoadResult::Skipped {
                    source,
                    reason: "disallowed by robots.txt".to_string(),
                };
            }
        }

        let page = match self.fetcher.fetch(&url) {
            Ok(page) => page,
            Err(error) => {
                self.last_fetch.insert(host, Instant::now());
                return LoadResult::Failure { source, error };
            }
        };
        self.last_fetch.insert(host, Instant::now());

        // The fetch may have followed redirects; the address that
        // actually answered must pass the same check as the request URL.
        if let Err(error) = check_blocked_address(&page.final_url) {
            warn!(%source, final_url = %page.final_url, %error, "redirect into blocked address rejected");
            return LoadResult::Failure { source, error };
        }

        if !(200..300).contains(&page.status) {
            return LoadResult::Failure {
                source,
                error: QuarryError::network(format!("HTTP {} from {}", page.status, page.final_url)),
            };
        }
        self.pages_fetched += 1;

        // Missing content type is treated as HTML; servers that omit it
        // overwhelmingly serve pages.
        let content_type = page
            .content_type
            .clone()
            .unwrap_or_else(|| "text/html".to_string());
        if !self.config.accepts_content_type(&content_type) {
            return LoadResult::Skipped {
                source,
                reason: format!("content type {content_type} not accepted"),
            };
        }

        let (title, text, links) = if content_type.to_lowercase().starts_with("text/html") {
            let extracted = self.extractor.extract(&page.final_url, &page.body);
            (extracted.title, extracted.text, extracted.links)
        } else {
            (None, page.body.clone(), Vec::new())
        };

        if depth < self.config.max_depth {
            self.enqueue_links(links, depth);
        }

        let mut doc = Document {
            id: page.final_url.as_str().to_string(),
            content: text,
            metadata: std::collections::HashMap::new(),
            hints: None,
            version: None,
        };
        doc.version = Some(DocumentVersion::of_content(&doc.content));
        doc.metadata.insert("url".to_string(), page.final_url.as_str().to_string());
        doc.metadata.insert("content_type".to_string(), content_type);
        doc.metadata.insert("depth".to_string(), depth.to_string());
        doc.metadata
            .insert("fetched_at".to_string(), chrono::Utc::now().to_rfc3339());
        if let Some(title) = title {
            doc.metadata.insert("title".to_string(), title);
        }

        LoadResult::Success(doc)
    }
}

impl Iterator for CrawlIter<'_> {
    type Item = LoadResult;

    fn next(&mut self) -> Option<LoadResult> {
        if let Some(result) = self.pending.pop_front() {
            return Some(result);
        }
        if self.pages_fetched >= self.config.max_pages {
            return None;
        }
        let (url, depth) = self.frontier.pop_front()?;
        Some(self.crawl_one(url, depth))
    }
}

/// Naive registrable domain: the last two labels of the host. IP
/// literals are kept whole.
fn base_domain(host: &str) -> String {
    let host = host.to_lowercase();
    if host.parse::<std::net::IpAddr>().is_ok() {
        return host;
    }
    let labels: Vec<&str> = host.rsplitn(3, '.').collect();
    if labels.len() >= 2 {
        format!("{}.{}", labels[1], labels[0])
    } else {
        host
    }
}
