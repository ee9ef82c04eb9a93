//! Sync engine: diff a loader's output against the registry and drive
//! idempotent writes into both indices.
//!
//! For every document a loader emits, the engine compares its content
//! hash with the registry's stored version: absent means **added**, a
//! differing hash means **updated**, an identical hash means
//! **unchanged** (no writes at all). After the full pass, registered ids
//! the source no longer produced are **deleted** from both indices and
//! unregistered. Running sync twice with an unchanged source therefore
//! yields `(0, 0, 0, N)` the second time.
//!
//! The registry is mutated only here, and only after the index writes
//! for that specific document succeeded; a failure on one document
//! never corrupts registry state for the others.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::Result;
use crate::keyword::{KeywordDocument, KeywordIndex};
use crate::loader::{DocumentLoader, LoadResult};
use crate::registry::DocumentRegistry;
use crate::vector::{VectorRecord, VectorStore};

/// Collaborator boundary: turns text into an embedding vector.
///
/// The retrieval layer never computes embeddings itself; callers wanting
/// vector-side sync inject an implementation of this trait.
pub trait Embedder: Send + Sync {
    /// Embed one text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Per-run sync outcome counts. Derived, never mutated after the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Documents indexed for the first time.
    pub added: usize,
    /// Documents re-indexed because their content hash changed.
    pub updated: usize,
    /// Registered documents removed because the source no longer has them.
    pub deleted: usize,
    /// Documents whose hash matched; no writes issued.
    pub unchanged: usize,
    /// Documents that failed to load or index; the run continued.
    pub failed: usize,
}

/// Drives one loader's output into the keyword index and, optionally,
/// the vector store, keeping the registry consistent with what landed.
pub struct SyncEngine<'a> {
    registry: &'a dyn DocumentRegistry,
    keyword: &'a KeywordIndex,
    vector: Option<(&'a VectorStore, &'a dyn Embedder)>,
}

impl<'a> SyncEngine<'a> {
    /// Sync into the keyword index only.
    pub fn new(registry: &'a dyn DocumentRegistry, keyword: &'a KeywordIndex) -> Self {
        SyncEngine {
            registry,
            keyword,
            vector: None,
        }
    }

    /// Also sync into a vector store, embedding via the given collaborator.
    pub fn with_vector_store(
        mut self,
        store: &'a VectorStore,
        embedder: &'a dyn Embedder,
    ) -> Self {
        self.vector = Some((store, embedder));
        self
    }

    /// Run one full sync pass over the loader's current output.
    ///
    /// Per-document load and index failures are counted and logged, not
    /// fatal; registry I/O errors abort the run.
    pub fn sync(&self, loader: &dyn DocumentLoader) -> Result<SyncStats> {
        let mut stats = SyncStats::default();
        let mut seen: BTreeSet<String> = BTreeSet::new();

        for result in loader.load() {
            match result {
                LoadResult::Success(doc) => {
                    seen.insert(doc.id.clone());
                    self.sync_document(doc, &mut stats)?;
                }
                LoadResult::Failure { source, error } => {
                    warn!(%source, %error, "document failed to load");
                    stats.failed += 1;
                }
                LoadResult::Skipped { source, reason } => {
                    debug!(%source, %reason, "document skipped");
                }
            }
        }

        // Deletions need the full "seen" set, so they run after the pass.
        for id in self.registry.all_document_ids()?.difference(&seen) {
            self.delete_document(id, &mut stats);
        }

        info!(
            loader = %loader.description(),
            added = stats.added,
            updated = stats.updated,
            deleted = stats.deleted,
            unchanged = stats.unchanged,
            failed = stats.failed,
            "sync complete"
        );
        Ok(stats)
    }

    fn sync_document(&self, doc: Document, stats: &mut SyncStats) -> Result<()> {
        let version = doc.version_or_computed();
        let registered = self.registry.get_version(&doc.id)?;

        match registered {
            Some(existing) if existing.same_content(&version) => {
                stats.unchanged += 1;
                Ok(())
            }
            Some(_) => {
                let id = doc.id.clone();
                match self.index_document(doc) {
                    Ok(()) => {
                        self.registry.register(&id, version)?;
                        stats.updated += 1;
                    }
                    Err(e) => {
                        warn!(%id, error = %e, "re-index failed");
                        stats.failed += 1;
                    }
                }
                Ok(())
            }
            None => {
                let id = doc.id.clone();
                match self.index_document(doc) {
                    Ok(()) => {
                        self.registry.register(&id, version)?;
                        stats.added += 1;
                    }
                    Err(e) => {
                        warn!(%id, error = %e, "index failed");
                        stats.failed += 1;
                    }
                }
                Ok(())
            }
        }
    }

    /// Write one document into both indices; upsert semantics make this
    /// safe for added and updated documents alike.
    fn index_document(&self, doc: Document) -> Result<()> {
        if let Some((store, embedder)) = self.vector {
            let embedding = embedder.embed(&doc.content)?;
            store.upsert(VectorRecord {
                id: doc.id.clone(),
                embedding,
                content: Some(doc.content.clone()),
                metadata: doc.metadata.clone(),
            })?;
        }

        self.keyword.index(KeywordDocument {
            id: doc.id,
            content: doc.content,
            metadata: doc.metadata,
        })
    }

    fn delete_document(&self, id: &str, stats: &mut SyncStats) {
        let mut ok = true;
        if let Err(e) = self.keyword.delete(id) {
            warn!(%id, error = %e, "keyword delete failed");
            ok = false;
        }
        if let Some((store, _)) = self.vector {
            if let Err(e) = store.delete(id) {
                warn!(%id, error = %e, "vector delete failed");
                ok = false;
            }
        }
        // Keep the registry entry when a delete failed so the next run
        // retries it.
        if ok {
            match self.registry.unregister(id) {
                Ok(()) => stats.deleted += 1,
                Err(e) => {
                    warn!(%id, error = %e, "unregister failed");
                    stats.failed += 1;
                }
            }
        } else {
            stats.failed += 1;
        }
    }
}
