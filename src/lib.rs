//! # Quarry
//!
//! A hybrid retrieval library for retrieval-augmented generation:
//! a cosine-similarity vector store, a BM25-ranked keyword index, a
//! shared metadata-filter algebra, and the document loading, versioning,
//! and sync pipeline (including a politeness-constrained web crawler)
//! that keeps both indices current.
//!
//! ## Features
//!
//! - Pure Rust implementation
//! - Exact top-K cosine-similarity search with metadata filtering
//! - Positional inverted index with BM25 ranking, phrases, and `OR`
//! - One filter algebra translated by both stores (filter-then-rank)
//! - Content-hash change detection and idempotent index sync
//! - Bounded BFS crawler with robots.txt, per-host delay, and
//!   blocked-address (SSRF) protection
//!
//! Embeddings are computed by callers; the library consumes pre-computed
//! vectors and raw text.

pub mod crawler;
pub mod document;
pub mod error;
pub mod filter;
pub mod keyword;
pub mod loader;
pub mod registry;
pub mod sync;
pub mod vector;

pub mod prelude {
    //! Commonly used types, re-exported.
    pub use crate::crawler::{CrawlerConfig, WebCrawlerLoader};
    pub use crate::document::{Document, DocumentSource, DocumentVersion};
    pub use crate::error::{QuarryError, Result};
    pub use crate::filter::MetadataFilter;
    pub use crate::keyword::{KeywordDocument, KeywordIndex, KeywordMatch};
    pub use crate::loader::{DocumentLoader, LoadResult, LoadStats, LoaderExt};
    pub use crate::registry::{DocumentRegistry, InMemoryRegistry, JsonFileRegistry};
    pub use crate::sync::{Embedder, SyncEngine, SyncStats};
    pub use crate::vector::{ScoredRecord, VectorRecord, VectorStore};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
