//! Vector similarity store.
//!
//! Persists [`VectorRecord`]s (id, embedding, optional text, metadata)
//! and answers top-K cosine-similarity queries, optionally narrowed by a
//! metadata filter. Embeddings are computed by callers; this module only
//! stores and ranks them.
//!
//! # Module Structure
//!
//! - `similarity`: cosine similarity with strict dimension checking
//! - `store`: the store itself (CRUD, pagination, filtered search, stats)

pub mod similarity;
pub mod store;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use self::store::{VectorStore, VectorStoreConfig, VectorStoreStats};

/// A stored embedding with its id, optional source text, and metadata.
///
/// Upsert replaces by id. Embedding dimension is fixed per collection by
/// convention but not enforced across records; mixed dimensions coexist
/// and are reported distinctly in [`VectorStoreStats::dimensions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique record id.
    pub id: String,
    /// The embedding vector.
    pub embedding: Vec<f32>,
    /// Optional source text the embedding was computed from.
    pub content: Option<String>,
    /// String key/value metadata.
    pub metadata: HashMap<String, String>,
}

impl VectorRecord {
    /// Create a record from an id and embedding.
    pub fn new<I: Into<String>>(id: I, embedding: Vec<f32>) -> Self {
        VectorRecord {
            id: id.into(),
            embedding,
            content: None,
            metadata: HashMap::new(),
        }
    }

    /// Attach the source text.
    pub fn with_content<C: Into<String>>(mut self, content: C) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Attach a metadata key/value pair.
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The embedding's dimensionality.
    pub fn dimension(&self) -> usize {
        self.embedding.len()
    }
}

/// A record paired with its query-time cosine similarity score.
///
/// Never persisted; produced only by [`VectorStore::search`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// The matching record.
    pub record: VectorRecord,
    /// Cosine similarity in `[-1, 1]`.
    pub score: f64,
}
