//! Document loaders: lazy sequences of [`LoadResult`]s.
//!
//! A [`DocumentLoader`] produces a finite, single-pass, lazily evaluated
//! stream of per-item outcomes from some source (a file, a directory, an
//! in-memory list, a remote [`DocumentSource`], or a web crawl).
//! Re-invoking [`DocumentLoader::load`] restarts the stream; there is no
//! resume cursor. Per-item failures do not abort the stream; callers
//! wanting fail-fast semantics stop consuming on the first `Failure`.
//!
//! Combinators ([`LoaderExt`]) wrap a loader without forcing evaluation.
//!
//! # Module Structure
//!
//! - `file`: single-file and directory loaders
//! - `memory`: in-memory loader for fixed document lists
//! - `source`: adapter over the [`DocumentSource`] collaborator boundary
//! - `combinators`: wrapper loaders for `filter`/`map`/`take`/`drop`/...

pub mod combinators;
pub mod file;
pub mod memory;
pub mod source;

use crate::document::Document;
use crate::error::QuarryError;

pub use self::combinators::{CombinedLoader, LoaderExt};
pub use self::file::{DirectoryLoader, FileLoader};
pub use self::memory::InMemoryLoader;
pub use self::source::SourceBackedLoader;

/// The outcome of one attempted source item.
#[derive(Debug)]
pub enum LoadResult {
    /// The item was loaded into a document.
    Success(Document),
    /// The item failed to load; the stream continues.
    Failure {
        /// The source item that failed (path, URL, ...).
        source: String,
        /// What went wrong.
        error: QuarryError,
    },
    /// The item was deliberately not loaded (wrong type, filtered, ...).
    Skipped {
        /// The source item that was skipped.
        source: String,
        /// Why it was skipped.
        reason: String,
    },
}

impl LoadResult {
    /// The loaded document, when this result is a success.
    pub fn document(self) -> Option<Document> {
        match self {
            LoadResult::Success(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Aggregated counts over a loader's output, with collected failures.
#[derive(Debug, Default)]
pub struct LoadStats {
    /// Successfully loaded documents.
    pub loaded: usize,
    /// Per-item failures.
    pub failed: usize,
    /// Deliberately skipped items.
    pub skipped: usize,
    /// `(source, error)` pairs for every failure.
    pub errors: Vec<(String, String)>,
}

impl LoadStats {
    /// Account for one result.
    pub fn record(&mut self, result: &LoadResult) {
        match result {
            LoadResult::Success(_) => self.loaded += 1,
            LoadResult::Failure { source, error } => {
                self.failed += 1;
                self.errors.push((source.clone(), error.to_string()));
            }
            LoadResult::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Drain a result stream into stats, discarding the documents.
    pub fn collect<I: Iterator<Item = LoadResult>>(results: I) -> LoadStats {
        let mut stats = LoadStats::default();
        for result in results {
            stats.record(&result);
        }
        stats
    }
}

/// A producer of a lazy, finite stream of [`LoadResult`]s.
///
/// Implementations must be restartable: each call to `load` yields a
/// fresh pass over the source.
pub trait DocumentLoader: Send + Sync {
    /// Start a fresh pass over the source.
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_>;

    /// Human-readable description of the source.
    fn description(&self) -> String;

    /// Best-effort count of items, `None` when unknowable (e.g. a crawl).
    fn estimated_count(&self) -> Option<usize> {
        None
    }
}

impl<T: DocumentLoader + ?Sized> DocumentLoader for Box<T> {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        (**self).load()
    }

    fn description(&self) -> String {
        (**self).description()
    }

    fn estimated_count(&self) -> Option<usize> {
        (**self).estimated_count()
    }
}

/// Re-exported for adapter implementors.
pub use crate::document::{DocumentRef, RawDocument};
