//! BM25-ranked keyword index.
//!
//! Persists [`KeywordDocument`]s and answers full-text queries ranked by
//! BM25, optionally narrowed by a metadata filter, with optional
//! highlighted snippets. The inverted index keeps positional postings so
//! quoted phrases match exact adjacency.
//!
//! # Module Structure
//!
//! - `analysis`: lowercase word tokenizer with byte offsets
//! - `query`: query parser (bare terms, quoted phrases, `OR`)
//! - `scorer`: BM25 scoring
//! - `highlight`: bounded snippet extraction with bold markers
//! - `index`: the index itself

pub mod analysis;
pub mod highlight;
pub mod index;
pub mod query;
pub mod scorer;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use self::index::{KeywordIndex, KeywordIndexConfig};

/// A document stored in the keyword index.
///
/// Upsert replaces by id; the derived token postings are maintained by
/// the index, never modeled by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordDocument {
    /// Unique document id.
    pub id: String,
    /// Full text content.
    pub content: String,
    /// String key/value metadata.
    pub metadata: HashMap<String, String>,
}

impl KeywordDocument {
    /// Create a document from an id and content.
    pub fn new<I: Into<String>, C: Into<String>>(id: I, content: C) -> Self {
        KeywordDocument {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata key/value pair.
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A query-time match: document id, BM25 score, optional highlights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordMatch {
    /// Id of the matching document.
    pub id: String,
    /// BM25 score; engine-dependent magnitude, comparable within a call.
    pub score: f64,
    /// Highlighted snippets, populated by `search_with_highlights`.
    pub highlights: Vec<String>,
}
