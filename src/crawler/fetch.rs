//! The crawler's HTTP boundary and the blocked-address SSRF control.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;

use crate::error::{QuarryError, Result};

/// One fetched page, as handed to extraction.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Response content type, if the server sent one.
    pub content_type: Option<String>,
    /// Response body decoded as text.
    pub body: String,
}

/// The crawl scheduler's view of HTTP.
///
/// Injectable so tests drive crawls against canned pages without any
/// network access.
pub trait Fetcher: Send + Sync {
    /// Issue a GET for the given URL.
    fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// Blocking reqwest fetcher with a timeout and user-agent.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given timeout and user-agent.
    pub fn new(timeout_ms: u64, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(user_agent)
            .build()
            .map_err(|e| QuarryError::configuration(format!("HTTP client: {e}")))?;
        Ok(HttpFetcher { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| QuarryError::network(format!("GET {url}: {e}")))?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .map_err(|e| QuarryError::network(format!("reading body of {final_url}: {e}")))?;

        Ok(FetchedPage {
            final_url,
            status,
            content_type,
            body,
        })
    }
}

/// Hostnames that resolve to cloud instance-metadata services.
const BLOCKED_HOSTS: &[&str] = &["metadata.google.internal", "metadata.goog"];

/// Reject URLs pointing at loopback, link-local, or metadata-service
/// addresses before any network call is made.
///
/// This is the SSRF control for crawled links, not an optional feature:
/// the error names the blocked range so rejections are diagnosable.
/// Private RFC1918 ranges are deliberately allowed, since intranet
/// crawls are a legitimate use. The check inspects IP literals and known metadata
/// hostnames; it does not resolve DNS.
pub fn check_blocked_address(url: &Url) -> Result<()> {
    let Some(host) = url.host_str() else {
        return Err(QuarryError::network(format!("URL {url} has no host")));
    };

    let lowered = host.to_lowercase();
    if BLOCKED_HOSTS.contains(&lowered.as_str()) {
        return Err(QuarryError::blocked_range(
            url.to_string(),
            format!("metadata-service host {lowered}"),
        ));
    }

    let literal = lowered.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        if let Some(range) = blocked_range_of(&ip) {
            return Err(QuarryError::blocked_range(url.to_string(), range.to_string()));
        }
    }

    Ok(())
}

fn blocked_range_of(ip: &IpAddr) -> Option<&'static str> {
    match ip {
        IpAddr::V4(v4) => {
            if v4.is_loopback() {
                Some("127.0.0.0/8")
            } else if v4.is_link_local() {
                Some("169.254.0.0/16")
            } else {
                None
            }
        }
        IpAddr::V6(v6) => {
            if v6.is_loopback() {
                Some("::1/128")
            } else if (v6.segments()[0] & 0xffc0) == 0xfe80 {
                Some("fe80::/10")
            } else if let Some(mapped) = v6.to_ipv4_mapped() {
                blocked_range_of(&IpAddr::V4(mapped))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_metadata_service_ip_is_blocked() {
        let err = check_blocked_address(&url("http://169.254.169.254/latest/meta-data/")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("blocked range"));
        assert!(msg.contains("169.254.0.0/16"));
    }

    #[test]
    fn test_loopback_is_blocked() {
        assert!(check_blocked_address(&url("http://127.0.0.1:8080/")).is_err());
        assert!(check_blocked_address(&url("http://[::1]/")).is_err());
    }

    #[test]
    fn test_metadata_hostname_is_blocked() {
        let err = check_blocked_address(&url("http://metadata.google.internal/")).unwrap_err();
        assert!(err.to_string().contains("metadata-service host"));
    }

    #[test]
    fn test_ipv6_link_local_is_blocked() {
        assert!(check_blocked_address(&url("http://[fe80::1]/")).is_err());
    }

    #[test]
    fn test_public_and_private_hosts_are_allowed() {
        assert!(check_blocked_address(&url("https://example.com/")).is_ok());
        // RFC1918 stays allowed: intranet crawls are legitimate.
        assert!(check_blocked_address(&url("http://10.0.0.5/wiki")).is_ok());
        assert!(check_blocked_address(&url("http://192.168.1.10/")).is_ok());
    }
}
