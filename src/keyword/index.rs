//! Positional inverted index with BM25 ranking.

use std::collections::HashMap;

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{QuarryError, Result};
use crate::filter::{MetadataFilter, compile_optional, matches_optional};
use crate::keyword::analysis::tokenize;
use crate::keyword::highlight::make_snippet;
use crate::keyword::query::{ParsedQuery, QueryTerm, parse_query};
use crate::keyword::scorer::Bm25Scorer;
use crate::keyword::{KeywordDocument, KeywordMatch};

/// Configuration for a [`KeywordIndex`].
#[derive(Debug, Clone)]
pub struct KeywordIndexConfig {
    /// Collection name, used in error messages and diagnostics.
    pub collection: String,
    /// Maximum number of documents accepted per batch call.
    pub max_batch_size: usize,
    /// BM25 k1 parameter.
    pub k1: f64,
    /// BM25 b parameter.
    pub b: f64,
}

impl Default for KeywordIndexConfig {
    fn default() -> Self {
        KeywordIndexConfig {
            collection: "keywords".to_string(),
            max_batch_size: 1000,
            k1: 1.2,
            b: 0.75,
        }
    }
}

#[derive(Debug)]
struct StoredDoc {
    /// Monotonic sequence for stable tie-breaking; kept across updates.
    seq: u64,
    content: String,
    metadata: HashMap<String, String>,
    /// Token count, the BM25 document length.
    length: u64,
    /// Unique terms in this document, for posting removal on delete.
    terms: Vec<String>,
}

#[derive(Debug, Default)]
struct KeywordIndexInner {
    docs: AHashMap<String, StoredDoc>,
    /// term -> doc id -> token positions (ascending).
    postings: AHashMap<String, AHashMap<String, Vec<u32>>>,
    total_length: u64,
    next_seq: u64,
}

impl KeywordIndexInner {
    fn avg_doc_length(&self) -> f64 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_length as f64 / self.docs.len() as f64
        }
    }

    fn remove_postings(&mut self, id: &str, terms: &[String]) {
        for term in terms {
            if let Some(docs) = self.postings.get_mut(term) {
                docs.remove(id);
                if docs.is_empty() {
                    self.postings.remove(term);
                }
            }
        }
    }

    fn apply_index(&mut self, doc: KeywordDocument) {
        let seq = match self.docs.remove(&doc.id) {
            Some(old) => {
                self.total_length -= old.length;
                self.remove_postings(&doc.id, &old.terms);
                old.seq
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                seq
            }
        };

        let tokens = tokenize(&doc.content);
        let mut positions: AHashMap<String, Vec<u32>> = AHashMap::new();
        for (pos, token) in tokens.iter().enumerate() {
            positions.entry(token.text.clone()).or_default().push(pos as u32);
        }

        let terms: Vec<String> = positions.keys().cloned().collect();
        for (term, pos_list) in positions {
            self.postings
                .entry(term)
                .or_default()
                .insert(doc.id.clone(), pos_list);
        }

        self.total_length += tokens.len() as u64;
        self.docs.insert(
            doc.id.clone(),
            StoredDoc {
                seq,
                content: doc.content,
                metadata: doc.metadata,
                length: tokens.len() as u64,
                terms,
            },
        );
    }

    fn apply_delete(&mut self, id: &str) -> bool {
        match self.docs.remove(id) {
            Some(old) => {
                self.total_length -= old.length;
                self.remove_postings(id, &old.terms);
                true
            }
            None => false,
        }
    }

    /// Doc ids satisfying every operand of one AND-group.
    fn group_candidates(&self, group: &[QueryTerm]) -> AHashSet<String> {
        let mut result: Option<AHashSet<String>> = None;
        for operand in group {
            let matches = match operand {
                QueryTerm::Term(term) => self
                    .postings
                    .get(term)
                    .map(|docs| docs.keys().cloned().collect())
                    .unwrap_or_default(),
                QueryTerm::Phrase(terms) => self.phrase_candidates(terms),
            };
            result = Some(match result {
                None => matches,
                Some(prev) => prev.intersection(&matches).cloned().collect(),
            });
            if result.as_ref().map(|ids| ids.is_empty()).unwrap_or(false) {
                break;
            }
        }
        result.unwrap_or_default()
    }

    /// Doc ids containing the phrase terms at adjacent, in-order positions.
    fn phrase_candidates(&self, terms: &[String]) -> AHashSet<String> {
        let mut out = AHashSet::new();
        let Some(first_term) = terms.first() else {
            return out;
        };
        let Some(first_docs) = self.postings.get(first_term) else {
            return out;
        };

        'docs: for (id, first_positions) in first_docs {
            let mut rest = Vec::with_capacity(terms.len() - 1);
            for term in &terms[1..] {
                match self.postings.get(term).and_then(|docs| docs.get(id)) {
                    Some(positions) => rest.push(positions),
                    None => continue 'docs,
                }
            }
            let adjacent = first_positions.iter().any(|&start| {
                rest.iter()
                    .enumerate()
                    .all(|(i, positions)| positions.binary_search(&(start + 1 + i as u32)).is_ok())
            });
            if adjacent {
                out.insert(id.clone());
            }
        }
        out
    }

    /// Sum of per-term BM25 scores for one document.
    fn score_doc(&self, id: &str, doc: &StoredDoc, query: &ParsedQuery, k1: f64, b: f64) -> f64 {
        let total_docs = self.docs.len() as u64;
        let avg = self.avg_doc_length();
        let mut score = 0.0;
        for term in query.all_terms() {
            if let Some(docs) = self.postings.get(&term) {
                if let Some(positions) = docs.get(id) {
                    let scorer =
                        Bm25Scorer::with_params(docs.len() as u64, total_docs, avg, k1, b);
                    score += scorer.score(positions.len() as f64, doc.length as f64);
                }
            }
        }
        score
    }
}

/// A BM25-ranked full-text index over [`KeywordDocument`]s.
///
/// Indexing is idempotent by id. Positional postings back quoted-phrase
/// queries; metadata filters narrow the candidate set before ranking so
/// `top_k` is satisfied by matching documents whenever enough exist.
/// Batch writes are applied under one write lock after validation.
#[derive(Debug)]
pub struct KeywordIndex {
    config: KeywordIndexConfig,
    inner: RwLock<KeywordIndexInner>,
}

impl KeywordIndex {
    /// Create an empty index with the given configuration.
    pub fn new(config: KeywordIndexConfig) -> Result<Self> {
        if config.collection.is_empty() {
            return Err(QuarryError::configuration("collection name must not be empty"));
        }
        if config.max_batch_size == 0 {
            return Err(QuarryError::configuration("max_batch_size must be non-zero"));
        }
        if config.k1 < 0.0 || !(0.0..=1.0).contains(&config.b) {
            return Err(QuarryError::configuration("BM25 parameters out of range"));
        }
        Ok(KeywordIndex {
            config,
            inner: RwLock::new(KeywordIndexInner::default()),
        })
    }

    /// Create an empty index with default configuration.
    pub fn with_defaults() -> Self {
        KeywordIndex {
            config: KeywordIndexConfig::default(),
            inner: RwLock::new(KeywordIndexInner::default()),
        }
    }

    fn validate(&self, doc: &KeywordDocument) -> Result<()> {
        if doc.id.is_empty() {
            return Err(QuarryError::configuration(format!(
                "document id must not be empty (collection {})",
                self.config.collection
            )));
        }
        Ok(())
    }

    /// Index or replace a document by id.
    pub fn index(&self, doc: KeywordDocument) -> Result<()> {
        self.validate(&doc)?;
        self.inner.write().apply_index(doc);
        Ok(())
    }

    /// Index or replace a batch of documents as one unit of work.
    ///
    /// The whole batch is validated before any document is written; the
    /// first invalid document aborts the call with no writes applied.
    pub fn index_batch(&self, docs: Vec<KeywordDocument>) -> Result<()> {
        if docs.len() > self.config.max_batch_size {
            return Err(QuarryError::configuration(format!(
                "batch of {} exceeds max_batch_size {}",
                docs.len(),
                self.config.max_batch_size
            )));
        }
        for doc in &docs {
            self.validate(doc)?;
        }
        let mut inner = self.inner.write();
        for doc in docs {
            inner.apply_index(doc);
        }
        Ok(())
    }

    /// Re-index a document; identical to [`KeywordIndex::index`] since
    /// indexing carries upsert semantics.
    pub fn update(&self, doc: KeywordDocument) -> Result<()> {
        self.index(doc)
    }

    /// Fetch a document by id; `Ok(None)` when absent.
    pub fn get(&self, id: &str) -> Result<Option<KeywordDocument>> {
        let inner = self.inner.read();
        Ok(inner.docs.get(id).map(|stored| KeywordDocument {
            id: id.to_string(),
            content: stored.content.clone(),
            metadata: stored.metadata.clone(),
        }))
    }

    /// Delete a document by id; reports whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.inner.write().apply_delete(id))
    }

    /// Delete a batch of ids as one unit of work, returning how many
    /// existed. Missing ids are not errors.
    pub fn delete_batch(&self, ids: &[String]) -> Result<usize> {
        let mut inner = self.inner.write();
        Ok(ids.iter().filter(|id| inner.apply_delete(id)).count())
    }

    /// Remove all documents.
    pub fn clear(&self) -> Result<()> {
        *self.inner.write() = KeywordIndexInner::default();
        Ok(())
    }

    /// Number of indexed documents.
    pub fn count(&self) -> Result<u64> {
        Ok(self.inner.read().docs.len() as u64)
    }

    /// BM25-ranked search, optionally narrowed by a metadata filter.
    ///
    /// Query syntax: bare terms (implicit AND), `"quoted phrases"`
    /// (exact adjacency), and infix `OR`. An empty query returns an
    /// empty result set, never an error. Candidates are filtered by
    /// metadata before ranking; ties break by indexing order.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<KeywordMatch>> {
        let parsed = parse_query(query);
        Ok(self.run_search(&parsed, top_k, filter))
    }

    /// Like [`KeywordIndex::search`], with a highlighted snippet per match.
    ///
    /// `snippet_length` is a soft byte cap; snippets end at token
    /// boundaries and wrap matched terms in bold markers.
    pub fn search_with_highlights(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
        snippet_length: usize,
    ) -> Result<Vec<KeywordMatch>> {
        let parsed = parse_query(query);
        let mut matches = self.run_search(&parsed, top_k, filter);

        let query_terms = parsed.all_terms();
        let inner = self.inner.read();
        for m in &mut matches {
            if let Some(stored) = inner.docs.get(&m.id) {
                m.highlights
                    .extend(make_snippet(&stored.content, &query_terms, snippet_length));
            }
        }
        Ok(matches)
    }

    fn run_search(
        &self,
        parsed: &ParsedQuery,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Vec<KeywordMatch> {
        if parsed.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let compiled = compile_optional(filter);
        let inner = self.inner.read();

        let mut candidates: AHashSet<String> = AHashSet::new();
        for group in &parsed.groups {
            candidates.extend(inner.group_candidates(group));
        }

        // Filter-then-rank: the metadata filter narrows candidates
        // before any scoring or truncation.
        let mut scored: Vec<(u64, f64, String)> = candidates
            .into_iter()
            .filter_map(|id| {
                let doc = inner.docs.get(&id)?;
                if !matches_optional(compiled.as_ref(), &doc.metadata) {
                    return None;
                }
                let score =
                    inner.score_doc(&id, doc, parsed, self.config.k1, self.config.b);
                Some((doc.seq, score, id))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        debug!(
            collection = %self.config.collection,
            returned = scored.len(),
            "keyword search"
        );

        scored
            .into_iter()
            .map(|(_, score, id)| KeywordMatch {
                id,
                score,
                highlights: Vec::new(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::MetadataFilter;

    fn index_with(docs: &[(&str, &str)]) -> KeywordIndex {
        let index = KeywordIndex::with_defaults();
        for (id, content) in docs {
            index.index(KeywordDocument::new(*id, *content)).unwrap();
        }
        index
    }

    #[test]
    fn test_index_is_idempotent() {
        let index = index_with(&[]);
        let doc = KeywordDocument::new("a", "some content");
        index.index(doc.clone()).unwrap();
        index.index(doc.clone()).unwrap();

        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(index.get("a").unwrap(), Some(doc));
    }

    #[test]
    fn test_update_replaces_postings() {
        let index = index_with(&[("a", "old topic")]);
        index.update(KeywordDocument::new("a", "new topic")).unwrap();

        assert!(index.search("old", 10, None).unwrap().is_empty());
        assert_eq!(index.search("new", 10, None).unwrap().len(), 1);
    }

    #[test]
    fn test_term_frequency_ranks_higher() {
        let index = index_with(&[
            ("partial", "database performance"),
            ("exact", "database database database"),
        ]);

        let results = index.search("database", 10, None).unwrap();
        let ids: Vec<&str> = results.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "partial"]);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_bare_terms_are_and_joined() {
        let index = index_with(&[
            ("both", "rust database internals"),
            ("one", "rust concurrency"),
        ]);

        let results = index.search("rust database", 10, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "both");
    }

    #[test]
    fn test_and_with_unknown_term_matches_nothing() {
        let index = index_with(&[("a", "rust database internals")]);
        // The unknown term empties the intersection immediately.
        assert!(index.search("nonexistent database", 10, None).unwrap().is_empty());
        assert!(index.search("database nonexistent", 10, None).unwrap().is_empty());
    }

    #[test]
    fn test_or_operator() {
        let index = index_with(&[
            ("r", "rust only"),
            ("g", "go only"),
            ("n", "neither language"),
        ]);

        let results = index.search("rust OR go", 10, None).unwrap();
        let mut ids: Vec<&str> = results.iter().map(|m| m.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["g", "r"]);
    }

    #[test]
    fn test_phrase_requires_adjacency() {
        let index = index_with(&[
            ("adjacent", "the borrow checker rejects this"),
            ("scattered", "borrow a book, then checker it"),
        ]);

        let results = index.search("\"borrow checker\"", 10, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "adjacent");
    }

    #[test]
    fn test_empty_query_returns_empty() {
        let index = index_with(&[("a", "anything")]);
        assert!(index.search("", 10, None).unwrap().is_empty());
        assert!(index.search("   ", 10, None).unwrap().is_empty());
    }

    #[test]
    fn test_filter_then_rank() {
        let index = KeywordIndex::with_defaults();
        for i in 0..5 {
            index
                .index(
                    KeywordDocument::new(format!("kept-{i}"), "database notes")
                        .with_metadata("team", "search"),
                )
                .unwrap();
        }
        index
            .index(
                KeywordDocument::new("excluded", "database database database")
                    .with_metadata("team", "infra"),
            )
            .unwrap();

        let filter = MetadataFilter::equals("team", "search");
        let results = index.search("database", 3, Some(&filter)).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|m| m.id.starts_with("kept-")));
    }

    #[test]
    fn test_delete_removes_from_search() {
        let index = index_with(&[("a", "database guide")]);
        assert!(index.delete("a").unwrap());
        assert!(!index.delete("a").unwrap());
        assert!(index.search("database", 10, None).unwrap().is_empty());
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_batch_validation_aborts_whole_batch() {
        let index = index_with(&[]);
        let batch = vec![
            KeywordDocument::new("ok", "fine"),
            KeywordDocument::new("", "missing id"),
        ];
        assert!(index.index_batch(batch).is_err());
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_highlights_wrap_terms() {
        let index = index_with(&[("a", "a long discussion about database tuning")]);
        let results = index
            .search_with_highlights("database", 10, None, 120)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].highlights[0].contains("**database**"));
    }

    #[test]
    fn test_get_missing_is_none() {
        let index = index_with(&[]);
        assert_eq!(index.get("nope").unwrap(), None);
    }
}
