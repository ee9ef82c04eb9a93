//! Query parser for the keyword index.
//!
//! The query language has three constructs: bare terms (implicitly
//! ANDed), quoted phrases (exact adjacency), and an infix `OR` between
//! operands. `rust "memory safety" OR go` parses as
//! `(rust AND "memory safety") OR (go)`. Phrase boundaries survive
//! parsing intact; the index matches them against positional postings.

use crate::keyword::analysis::terms;

/// One operand of a query group: a single term or an exact phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    /// A single term, matched anywhere in a document.
    Term(String),
    /// A phrase whose terms must appear adjacently, in order.
    Phrase(Vec<String>),
}

/// A parsed query: groups are OR-joined, terms within a group AND-joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    /// OR-joined groups of AND-joined operands.
    pub groups: Vec<Vec<QueryTerm>>,
}

impl ParsedQuery {
    /// Whether the query has no operands at all.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }

    /// All distinct terms mentioned anywhere in the query, for
    /// highlighting and posting lookups.
    pub fn all_terms(&self) -> Vec<String> {
        let mut out = Vec::new();
        for group in &self.groups {
            for term in group {
                match term {
                    QueryTerm::Term(t) => {
                        if !out.contains(t) {
                            out.push(t.clone());
                        }
                    }
                    QueryTerm::Phrase(ts) => {
                        for t in ts {
                            if !out.contains(t) {
                                out.push(t.clone());
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

/// Parse a raw query string.
///
/// An empty or all-punctuation query parses to an empty [`ParsedQuery`];
/// the index treats that as "match nothing". An unterminated quote runs
/// to the end of the input.
pub fn parse_query(raw: &str) -> ParsedQuery {
    let mut groups: Vec<Vec<QueryTerm>> = Vec::new();
    let mut current: Vec<QueryTerm> = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        if let Some(after_quote) = rest.strip_prefix('"') {
            let (inside, remainder) = match after_quote.find('"') {
                Some(end) => (&after_quote[..end], &after_quote[end + 1..]),
                None => (after_quote, ""),
            };
            let mut phrase_terms = terms(inside);
            match phrase_terms.len() {
                0 => {}
                // A one-word phrase is just a term.
                1 => current.push(QueryTerm::Term(phrase_terms.remove(0))),
                _ => current.push(QueryTerm::Phrase(phrase_terms)),
            }
            rest = remainder;
            continue;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (word, remainder) = rest.split_at(end);
        rest = remainder;

        if word == "OR" {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            continue;
        }

        for term in terms(word) {
            current.push(QueryTerm::Term(term));
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }
    ParsedQuery { groups }
}
