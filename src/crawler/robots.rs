//! robots.txt parsing with a per-crawl cache.
//!
//! Policy: robots handling is fail-open. When a host's robots.txt cannot
//! be fetched (network error, non-success status), the crawler proceeds
//! as if the host allowed everything, logging the decision. Callers who
//! want no robots handling at all set `respect_robots_txt = false`.

use ahash::AHashMap;
use reqwest::Url;
use tracing::{debug, warn};

use crate::crawler::fetch::Fetcher;

/// One rule line from a robots.txt group.
#[derive(Debug, Clone)]
struct Rule {
    allow: bool,
    prefix: String,
}

/// The parsed robots.txt policy applicable to one user-agent.
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    rules: Vec<Rule>,
}

impl RobotsPolicy {
    /// A policy allowing every path.
    pub fn allow_all() -> Self {
        RobotsPolicy::default()
    }

    /// Parse a robots.txt body, keeping the groups that apply to
    /// `user_agent` (or to `*`).
    ///
    /// Only `User-agent`, `Allow`, and `Disallow` lines are honored;
    /// everything else (crawl-delay, sitemaps, comments) is ignored.
    pub fn parse(body: &str, user_agent: &str) -> Self {
        let ua_token = user_agent
            .split('/')
            .next()
            .unwrap_or(user_agent)
            .to_lowercase();

        let mut rules = Vec::new();
        let mut group_applies = false;
        let mut in_agent_lines = false;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    // A fresh block of agent lines starts a new group.
                    if !in_agent_lines {
                        group_applies = false;
                    }
                    in_agent_lines = true;
                    let agent = value.to_lowercase();
                    if agent == "*" || ua_token.starts_with(&agent) {
                        group_applies = true;
                    }
                }
                "allow" | "disallow" => {
                    in_agent_lines = false;
                    // An empty Disallow means "allow everything".
                    if group_applies && !value.is_empty() {
                        rules.push(Rule {
                            allow: field == "allow",
                            prefix: value.to_string(),
                        });
                    }
                }
                _ => {
                    in_agent_lines = false;
                }
            }
        }

        RobotsPolicy { rules }
    }

    /// Whether this policy allows fetching `path`.
    ///
    /// Longest matching prefix wins; on a tie, `Allow` wins. No rule
    /// matching means allowed.
    pub fn allows(&self, path: &str) -> bool {
        let mut best_len = 0usize;
        let mut allowed = true;
        for rule in &self.rules {
            if path.starts_with(&rule.prefix) {
                let len = rule.prefix.len();
                if len > best_len || (len == best_len && rule.allow) {
                    best_len = len;
                    allowed = rule.allow;
                }
            }
        }
        allowed
    }
}

/// Per-crawl cache of robots policies, keyed by host.
///
/// Never global: each crawler instance constructs its own cache, so a
/// fresh instance starts clean and tests never need to reset shared
/// state.
#[derive(Default)]
pub struct RobotsCache {
    policies: AHashMap<String, RobotsPolicy>,
    user_agent: String,
}

impl RobotsCache {
    /// Create an empty cache for the given user-agent.
    pub fn new<S: Into<String>>(user_agent: S) -> Self {
        RobotsCache {
            policies: AHashMap::new(),
            user_agent: user_agent.into(),
        }
    }

    /// Ensure the policy for the URL's host is cached, fetching
    /// `/robots.txt` through `fetcher` when it is not. Returns whether a
    /// network fetch was issued, so the caller can account for it in its
    /// per-host throttle.
    pub fn prepare(&mut self, fetcher: &dyn Fetcher, url: &Url) -> bool {
        let Some(key) = host_key(url) else {
            return false;
        };
        if self.policies.contains_key(&key) {
            return false;
        }
        let policy = self.fetch_policy(fetcher, url);
        self.policies.insert(key, policy);
        true
    }

    /// Whether the cached policy for the URL's host allows fetching it.
    /// Hosts with no cached policy are allowed.
    pub fn allows(&self, url: &Url) -> bool {
        let Some(key) = host_key(url) else {
            return true;
        };
        self.policies
            .get(&key)
            .map(|p| p.allows(url.path()))
            .unwrap_or(true)
    }

    fn fetch_policy(&self, fetcher: &dyn Fetcher, url: &Url) -> RobotsPolicy {
        let robots_url = match url.join("/robots.txt") {
            Ok(u) => u,
            Err(e) => {
                warn!(%url, error = %e, "cannot build robots.txt URL, allowing (fail-open)");
                return RobotsPolicy::allow_all();
            }
        };

        match fetcher.fetch(&robots_url) {
            Ok(page) if (200..300).contains(&page.status) => {
                debug!(%robots_url, "robots.txt fetched");
                RobotsPolicy::parse(&page.body, &self.user_agent)
            }
            Ok(page) => {
                debug!(%robots_url, status = page.status, "no usable robots.txt, allowing (fail-open)");
                RobotsPolicy::allow_all()
            }
            Err(e) => {
                warn!(%robots_url, error = %e, "robots.txt fetch failed, allowing (fail-open)");
                RobotsPolicy::allow_all()
            }
        }
    }
}

fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
