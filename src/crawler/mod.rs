//! Politeness-constrained web crawler, exposed as a document loader.
//!
//! [`WebCrawlerLoader`] runs a bounded breadth-first traversal from one
//! or more seed URLs, producing one [`crate::document::Document`] per
//! accepted page. Every constraint (depth, page and queue caps,
//! same-domain, follow/exclude patterns, robots.txt, per-host delay, and
//! the blocked-address SSRF control) is enforced before a fetch is
//! issued.
//!
//! # Module Structure
//!
//! - `config`: crawl limits and pattern compilation
//! - `fetch`: the HTTP boundary ([`Fetcher`]) and blocked-range checks
//! - `robots`: robots.txt parsing with a per-crawl cache
//! - `extract`: HTML text, title, and link extraction
//! - `loader`: the BFS scheduler implementing `DocumentLoader`

pub mod config;
pub mod extract;
pub mod fetch;
pub mod loader;
pub mod robots;

pub use self::config::CrawlerConfig;
pub use self::fetch::{FetchedPage, Fetcher, HttpFetcher};
pub use self::loader::WebCrawlerLoader;
pub use self::robots::{RobotsCache, RobotsPolicy};
