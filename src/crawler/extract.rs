//! HTML extraction: visible text, title, and anchor links.

use regex::Regex;
use reqwest::Url;
use tracing::debug;

use crate::error::{QuarryError, Result};

/// What extraction produced for one page.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// Contents of the `<title>` element, if present.
    pub title: Option<String>,
    /// Visible text with tags stripped and whitespace collapsed.
    pub text: String,
    /// Absolute, fragment-stripped links discovered in anchors.
    pub links: Vec<Url>,
}

/// Regex-based HTML extractor.
///
/// Compiled patterns live on the instance, constructed once per crawl,
/// never in process-wide statics.
pub struct HtmlExtractor {
    anchor_re: Regex,
    title_re: Regex,
    script_re: Regex,
    tag_re: Regex,
}

impl HtmlExtractor {
    /// Compile the extraction patterns.
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| QuarryError::processing(format!("extractor pattern: {e}")))
        };
        Ok(HtmlExtractor {
            anchor_re: compile(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"'#][^"']*)["']"#)?,
            title_re: compile(r"(?is)<title[^>]*>(.*?)</title>")?,
            script_re: compile(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>")?,
            tag_re: compile(r"(?s)<[^>]*>")?,
        })
    }

    /// Extract text, title, and links from an HTML body fetched at `base`.
    pub fn extract(&self, base: &Url, html: &str) -> ExtractedPage {
        let title = self
            .title_re
            .captures(html)
            .map(|c| collapse_whitespace(&decode_entities(&c[1])))
            .filter(|t| !t.is_empty());

        let without_scripts = self.script_re.replace_all(html, " ");
        let without_tags = self.tag_re.replace_all(&without_scripts, " ");
        let text = collapse_whitespace(&decode_entities(&without_tags));

        let mut links = Vec::new();
        for capture in self.anchor_re.captures_iter(html) {
            let href = decode_entities(&capture[1]);
            match base.join(href.trim()) {
                Ok(mut url) => {
                    if url.scheme() != "http" && url.scheme() != "https" {
                        continue;
                    }
                    url.set_fragment(None);
                    links.push(url);
                }
                Err(e) => {
                    debug!(%href, error = %e, "unresolvable link dropped");
                }
            }
        }

        ExtractedPage { title, text, links }
    }
}

/// Decode the handful of entities that matter for plain-text indexing.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
