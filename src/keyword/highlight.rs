//! Snippet extraction with bold markers around matched terms.

use crate::keyword::analysis::{Token, tokenize};

/// Marker wrapped around matched terms in a snippet.
pub const HIGHLIGHT_MARKER: &str = "**";

/// Build a highlighted snippet of `content` around the first matched term.
///
/// Matched terms are wrapped in [`HIGHLIGHT_MARKER`]. `snippet_length` is
/// a soft cap in bytes: the window grows token by token and always ends
/// at a token boundary, never mid-token. Returns `None` when no query
/// term occurs in the content.
pub fn make_snippet(content: &str, query_terms: &[String], snippet_length: usize) -> Option<String> {
    let tokens = tokenize(content);
    let matched: Vec<bool> = tokens
        .iter()
        .map(|t| query_terms.iter().any(|q| q == &t.text))
        .collect();
    let first = matched.iter().position(|&m| m)?;

    let (start, end) = snippet_window(&tokens, first, snippet_length);

    let mut snippet = String::new();
    let mut cursor = tokens[start].start;
    for (i, token) in tokens[start..=end].iter().enumerate() {
        snippet.push_str(&content[cursor..token.start]);
        if matched[start + i] {
            snippet.push_str(HIGHLIGHT_MARKER);
            snippet.push_str(&content[token.start..token.end]);
            snippet.push_str(HIGHLIGHT_MARKER);
        } else {
            snippet.push_str(&content[token.start..token.end]);
        }
        cursor = token.end;
    }
    Some(snippet)
}

/// Choose the token window for a snippet centred on `first`, bounded by
/// `snippet_length` bytes of source text.
fn snippet_window(tokens: &[Token], first: usize, snippet_length: usize) -> (usize, usize) {
    let lead_budget = snippet_length / 4;
    let mut start = first;
    while start > 0 && tokens[first].start - tokens[start - 1].start <= lead_budget {
        start -= 1;
    }

    let mut end = first;
    while end + 1 < tokens.len() && tokens[end + 1].end - tokens[start].start <= snippet_length {
        end += 1;
    }

    (start, end)
}
