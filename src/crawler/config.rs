//! Crawl configuration and URL pattern compilation.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{QuarryError, Result};

/// Limits and policies for one crawl.
///
/// All constraints are enforced before a fetch is issued. Robots.txt
/// handling is fail-open: when a domain's robots.txt cannot be fetched,
/// crawling proceeds as if it allowed everything.
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Starting URLs; each is crawled at depth 0.
    pub seeds: Vec<String>,
    /// Maximum BFS depth from the nearest seed; 0 = seed pages only.
    pub max_depth: usize,
    /// Global cap on successfully fetched pages.
    pub max_pages: usize,
    /// Bound on the pending-URL frontier; once full, newly discovered
    /// links are dropped, not queued.
    pub max_queue_size: usize,
    /// Discard discovered links outside the seeds' registrable domains.
    pub same_domain_only: bool,
    /// Glob patterns a discovered link must match to be followed; empty
    /// means match everything.
    pub follow_patterns: Vec<String>,
    /// Glob patterns that veto a discovered link.
    pub exclude_patterns: Vec<String>,
    /// Fetch and honor each domain's robots.txt before its first page.
    pub respect_robots_txt: bool,
    /// Minimum wall-clock delay between fetches to the same host.
    pub delay_ms: u64,
    /// Network timeout per request.
    pub timeout_ms: u64,
    /// Response content types to index; others are skipped, not failed.
    pub accept_content_types: Vec<String>,
    /// User-agent sent with every request and matched in robots.txt.
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        CrawlerConfig {
            seeds: Vec::new(),
            max_depth: 2,
            max_pages: 100,
            max_queue_size: 1000,
            same_domain_only: true,
            follow_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            respect_robots_txt: true,
            delay_ms: 500,
            timeout_ms: 10_000,
            accept_content_types: vec!["text/html".to_string(), "text/plain".to_string()],
            user_agent: concat!("quarry-crawler/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl CrawlerConfig {
    /// Preset for fetching exactly one page: depth 0, one page.
    pub fn single_page<S: Into<String>>(url: S) -> Self {
        CrawlerConfig {
            seeds: vec![url.into()],
            max_depth: 0,
            max_pages: 1,
            ..Default::default()
        }
    }

    /// Compile the follow/exclude patterns.
    pub fn compile_patterns(&self) -> Result<UrlPatterns> {
        Ok(UrlPatterns {
            follow: build_glob_set(&self.follow_patterns)?,
            exclude: build_glob_set(&self.exclude_patterns)?,
        })
    }

    /// Whether a content type (parameters stripped) is accepted.
    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        let main = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_lowercase();
        self.accept_content_types.iter().any(|a| a.eq_ignore_ascii_case(&main))
    }
}

fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| QuarryError::configuration(format!("bad URL pattern {pattern:?}: {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| QuarryError::configuration(format!("pattern compilation failed: {e}")))
}

/// Compiled follow/exclude patterns, built once per crawl instance.
#[derive(Debug, Clone)]
pub struct UrlPatterns {
    follow: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl UrlPatterns {
    /// Whether a discovered link should be followed: it must match at
    /// least one follow pattern (absent = match everything) and no
    /// exclude pattern.
    pub fn allows(&self, url: &str) -> bool {
        let followed = self.follow.as_ref().map(|g| g.is_match(url)).unwrap_or(true);
        let excluded = self.exclude.as_ref().map(|g| g.is_match(url)).unwrap_or(false);
        followed && !excluded
    }
}
