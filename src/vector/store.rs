//! In-process vector store with filtered cosine-similarity search.

use std::collections::BTreeSet;

use ahash::AHashMap;
use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{QuarryError, Result};
use crate::filter::{MetadataFilter, compile_optional, matches_optional};
use crate::vector::similarity::cosine_similarity;
use crate::vector::{ScoredRecord, VectorRecord};

/// Configuration for a [`VectorStore`].
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Collection name, used in error messages and diagnostics.
    pub collection: String,
    /// Maximum number of records accepted per batch call.
    pub max_batch_size: usize,
    /// Candidate-set size above which search scoring runs in parallel.
    pub parallel_threshold: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        VectorStoreConfig {
            collection: "vectors".to_string(),
            max_batch_size: 1000,
            parallel_threshold: 1024,
        }
    }
}

/// Aggregate statistics for a [`VectorStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorStoreStats {
    /// Total number of stored records.
    pub total_records: u64,
    /// Distinct embedding dimensions present in the collection.
    pub dimensions: BTreeSet<usize>,
}

#[derive(Debug, Default)]
struct VectorStoreInner {
    /// Records in insertion order; order is the pagination and tie-break
    /// contract, so deletes shift rather than swap.
    records: Vec<VectorRecord>,
    /// id -> position in `records`.
    index: AHashMap<String, usize>,
}

/// An insertion-ordered vector store with exact cosine-similarity search.
///
/// Upserts are idempotent by id. Batch writes are applied under one write
/// lock after full validation, so concurrent readers never observe a
/// partially-applied batch. Search filters candidates by metadata before
/// ranking, compares only records whose dimension matches the query, and
/// breaks score ties by insertion order.
#[derive(Debug)]
pub struct VectorStore {
    config: VectorStoreConfig,
    inner: RwLock<VectorStoreInner>,
}

impl VectorStore {
    /// Create an empty store with the given configuration.
    pub fn new(config: VectorStoreConfig) -> Result<Self> {
        if config.collection.is_empty() {
            return Err(QuarryError::configuration("collection name must not be empty"));
        }
        if config.max_batch_size == 0 {
            return Err(QuarryError::configuration("max_batch_size must be non-zero"));
        }
        Ok(VectorStore {
            config,
            inner: RwLock::new(VectorStoreInner::default()),
        })
    }

    /// Create an empty store with default configuration.
    pub fn with_defaults() -> Self {
        VectorStore {
            config: VectorStoreConfig::default(),
            inner: RwLock::new(VectorStoreInner::default()),
        }
    }

    fn validate(&self, record: &VectorRecord) -> Result<()> {
        if record.id.is_empty() {
            return Err(QuarryError::configuration(format!(
                "record id must not be empty (collection {})",
                self.config.collection
            )));
        }
        if record.embedding.is_empty() {
            return Err(QuarryError::configuration(format!(
                "record {} has an empty embedding",
                record.id
            )));
        }
        Ok(())
    }

    /// Insert or replace a record by id.
    pub fn upsert(&self, record: VectorRecord) -> Result<()> {
        self.validate(&record)?;
        let mut inner = self.inner.write();
        Self::apply_upsert(&mut inner, record);
        Ok(())
    }

    /// Insert or replace a batch of records as one unit of work.
    ///
    /// The whole batch is validated before any record is written; the
    /// first invalid record aborts the call with no writes applied.
    pub fn upsert_batch(&self, records: Vec<VectorRecord>) -> Result<()> {
        if records.len() > self.config.max_batch_size {
            return Err(QuarryError::configuration(format!(
                "batch of {} exceeds max_batch_size {}",
                records.len(),
                self.config.max_batch_size
            )));
        }
        for record in &records {
            self.validate(record)?;
        }
        let mut inner = self.inner.write();
        for record in records {
            Self::apply_upsert(&mut inner, record);
        }
        Ok(())
    }

    fn apply_upsert(inner: &mut VectorStoreInner, record: VectorRecord) {
        match inner.index.get(&record.id) {
            Some(&pos) => {
                // Replace in place: the record keeps its insertion slot.
                inner.records[pos] = record;
            }
            None => {
                inner.index.insert(record.id.clone(), inner.records.len());
                inner.records.push(record);
            }
        }
    }

    /// Fetch a record by id; `Ok(None)` when absent.
    pub fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        let inner = self.inner.read();
        Ok(inner.index.get(id).map(|&pos| inner.records[pos].clone()))
    }

    /// Delete a record by id, returning it; `Ok(None)` when absent.
    pub fn delete(&self, id: &str) -> Result<Option<VectorRecord>> {
        let mut inner = self.inner.write();
        Ok(Self::apply_delete(&mut inner, id))
    }

    /// Delete a batch of ids as one unit of work, returning how many
    /// existed. Missing ids are not errors.
    pub fn delete_batch(&self, ids: &[String]) -> Result<usize> {
        let mut inner = self.inner.write();
        let mut removed = 0;
        for id in ids {
            if Self::apply_delete(&mut inner, id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn apply_delete(inner: &mut VectorStoreInner, id: &str) -> Option<VectorRecord> {
        let pos = inner.index.remove(id)?;
        let record = inner.records.remove(pos);
        for shifted in &inner.records[pos..] {
            if let Some(entry) = inner.index.get_mut(&shifted.id) {
                *entry -= 1;
            }
        }
        Some(record)
    }

    /// Remove all records.
    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.records.clear();
        inner.index.clear();
        Ok(())
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<u64> {
        Ok(self.inner.read().records.len() as u64)
    }

    /// List records in insertion order with offset/limit pagination,
    /// optionally narrowed by a metadata filter.
    ///
    /// Over unchanged data, pages at disjoint offsets return disjoint
    /// id sets.
    pub fn list(
        &self,
        filter: Option<&MetadataFilter>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<VectorRecord>> {
        let compiled = compile_optional(filter);
        let inner = self.inner.read();
        Ok(inner
            .records
            .iter()
            .filter(|r| matches_optional(compiled.as_ref(), &r.metadata))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Top-K cosine-similarity search, optionally narrowed by a filter.
    ///
    /// Candidates are filtered by metadata before ranking, so `top_k` is
    /// satisfied by matching records whenever enough exist. Records whose
    /// dimension differs from the query are skipped rather than compared.
    /// Ties are broken by insertion order, stable within a call.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredRecord>> {
        if query.is_empty() {
            return Err(QuarryError::configuration("query vector must not be empty"));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let compiled = compile_optional(filter);
        let inner = self.inner.read();

        // Filter-then-rank: narrow by metadata and dimension first.
        let candidates: Vec<usize> = inner
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.embedding.len() == query.len()
                    && matches_optional(compiled.as_ref(), &r.metadata)
            })
            .map(|(pos, _)| pos)
            .collect();

        let score_one = |&pos: &usize| -> Result<(usize, f64)> {
            let score = cosine_similarity(query, &inner.records[pos].embedding)?;
            Ok((pos, score))
        };

        let mut scored: Vec<(usize, f64)> = if candidates.len() >= self.config.parallel_threshold {
            candidates.par_iter().map(score_one).collect::<Result<_>>()?
        } else {
            candidates.iter().map(score_one).collect::<Result<_>>()?
        };

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        debug!(
            collection = %self.config.collection,
            candidates = candidates.len(),
            returned = scored.len(),
            "vector search"
        );

        Ok(scored
            .into_iter()
            .map(|(pos, score)| ScoredRecord {
                record: inner.records[pos].clone(),
                score,
            })
            .collect())
    }

    /// Aggregate statistics: record count and distinct dimensions.
    pub fn stats(&self) -> Result<VectorStoreStats> {
        let inner = self.inner.read();
        let dimensions = inner.records.iter().map(|r| r.embedding.len()).collect();
        Ok(VectorStoreStats {
            total_records: inner.records.len() as u64,
            dimensions,
        })
    }
}
