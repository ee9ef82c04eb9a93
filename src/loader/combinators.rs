//! Wrapper loaders composing other loaders without forcing evaluation.

use crate::document::{Document, DocumentHints};
use crate::loader::{DocumentLoader, LoadResult};

/// Combinators available on every [`DocumentLoader`].
///
/// Each method wraps the loader in a lazy adapter; nothing is read until
/// the wrapped loader's stream is consumed.
pub trait LoaderExt: DocumentLoader + Sized {
    /// Keep only documents for which `predicate` returns true; the rest
    /// become `Skipped` items.
    fn filter<F>(self, predicate: F) -> FilterLoader<Self, F>
    where
        F: Fn(&Document) -> bool + Send + Sync,
    {
        FilterLoader { inner: self, predicate }
    }

    /// Transform each successfully loaded document.
    fn map<F>(self, transform: F) -> MapLoader<Self, F>
    where
        F: Fn(Document) -> Document + Send + Sync,
    {
        MapLoader { inner: self, transform }
    }

    /// Stop after `n` results (of any kind).
    fn take(self, n: usize) -> TakeLoader<Self> {
        TakeLoader { inner: self, n }
    }

    /// Discard the first `n` results (of any kind).
    fn drop(self, n: usize) -> DropLoader<Self> {
        DropLoader { inner: self, n }
    }

    /// Attach a metadata key/value pair to every loaded document.
    fn with_metadata<K: Into<String>, V: Into<String>>(self, key: K, value: V) -> WithMetadataLoader<Self> {
        WithMetadataLoader {
            inner: self,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Attach chunking hints to every loaded document.
    fn with_hints(self, hints: DocumentHints) -> WithHintsLoader<Self> {
        WithHintsLoader { inner: self, hints }
    }

    /// Chain another loader after this one.
    fn combine<L: DocumentLoader>(self, other: L) -> CombinedLoader<Self, L> {
        CombinedLoader { first: self, second: other }
    }
}

impl<L: DocumentLoader + Sized> LoaderExt for L {}

/// See [`LoaderExt::filter`].
pub struct FilterLoader<L, F> {
    inner: L,
    predicate: F,
}

impl<L, F> DocumentLoader for FilterLoader<L, F>
where
    L: DocumentLoader,
    F: Fn(&Document) -> bool + Send + Sync,
{
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        Box::new(self.inner.load().map(move |result| match result {
            LoadResult::Success(doc) if !(self.predicate)(&doc) => LoadResult::Skipped {
                source: doc.id,
                reason: "filtered out".to_string(),
            },
            other => other,
        }))
    }

    fn description(&self) -> String {
        format!("{} (filtered)", self.inner.description())
    }

    fn estimated_count(&self) -> Option<usize> {
        // Upper bound only; the predicate may drop items.
        self.inner.estimated_count()
    }
}

/// See [`LoaderExt::map`].
pub struct MapLoader<L, F> {
    inner: L,
    transform: F,
}

impl<L, F> DocumentLoader for MapLoader<L, F>
where
    L: DocumentLoader,
    F: Fn(Document) -> Document + Send + Sync,
{
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        Box::new(self.inner.load().map(move |result| match result {
            LoadResult::Success(doc) => LoadResult::Success((self.transform)(doc)),
            other => other,
        }))
    }

    fn description(&self) -> String {
        format!("{} (mapped)", self.inner.description())
    }

    fn estimated_count(&self) -> Option<usize> {
        self.inner.estimated_count()
    }
}

/// See [`LoaderExt::take`].
pub struct TakeLoader<L> {
    inner: L,
    n: usize,
}

impl<L: DocumentLoader> DocumentLoader for TakeLoader<L> {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        Box::new(self.inner.load().take(self.n))
    }

    fn description(&self) -> String {
        format!("{} (first {})", self.inner.description(), self.n)
    }

    fn estimated_count(&self) -> Option<usize> {
        self.inner.estimated_count().map(|c| c.min(self.n))
    }
}

/// See [`LoaderExt::drop`].
pub struct DropLoader<L> {
    inner: L,
    n: usize,
}

impl<L: DocumentLoader> DocumentLoader for DropLoader<L> {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        Box::new(self.inner.load().skip(self.n))
    }

    fn description(&self) -> String {
        format!("{} (after {})", self.inner.description(), self.n)
    }

    fn estimated_count(&self) -> Option<usize> {
        self.inner.estimated_count().map(|c| c.saturating_sub(self.n))
    }
}

/// See [`LoaderExt::with_metadata`].
pub struct WithMetadataLoader<L> {
    inner: L,
    key: String,
    value: String,
}

impl<L: DocumentLoader> DocumentLoader for WithMetadataLoader<L> {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        Box::new(self.inner.load().map(move |result| match result {
            LoadResult::Success(mut doc) => {
                doc.metadata.insert(self.key.clone(), self.value.clone());
                LoadResult::Success(doc)
            }
            other => other,
        }))
    }

    fn description(&self) -> String {
        self.inner.description()
    }

    fn estimated_count(&self) -> Option<usize> {
        self.inner.estimated_count()
    }
}

/// See [`LoaderExt::with_hints`].
pub struct WithHintsLoader<L> {
    inner: L,
    hints: DocumentHints,
}

impl<L: DocumentLoader> DocumentLoader for WithHintsLoader<L> {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        Box::new(self.inner.load().map(move |result| match result {
            LoadResult::Success(mut doc) => {
                doc.hints = Some(self.hints.clone());
                LoadResult::Success(doc)
            }
            other => other,
        }))
    }

    fn description(&self) -> String {
        self.inner.description()
    }

    fn estimated_count(&self) -> Option<usize> {
        self.inner.estimated_count()
    }
}

/// See [`LoaderExt::combine`]: the second loader's stream follows the first's.
pub struct CombinedLoader<A, B> {
    first: A,
    second: B,
}

impl<A: DocumentLoader, B: DocumentLoader> DocumentLoader for CombinedLoader<A, B> {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        Box::new(self.first.load().chain(self.second.load()))
    }

    fn description(&self) -> String {
        format!("{} + {}", self.first.description(), self.second.description())
    }

    fn estimated_count(&self) -> Option<usize> {
        match (self.first.estimated_count(), self.second.estimated_count()) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{InMemoryLoader, LoadStats};

    fn loader(ids: &[&str]) -> InMemoryLoader {
        InMemoryLoader::new(
            ids.iter()
                .map(|id| Document::new(*id, format!("content of {id}")))
                .collect(),
        )
    }

    #[test]
    fn test_filter_skips_rather_than_drops() {
        let filtered = loader(&["a", "b", "c"]).filter(|d| d.id != "b");
        let stats = LoadStats::collect(filtered.load());
        assert_eq!(stats.loaded, 2);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_map_transforms_documents() {
        let mapped = loader(&["a"]).map(|mut d| {
            d.content.push_str(" (mapped)");
            d
        });
        let docs: Vec<Document> = mapped.load().filter_map(LoadResult::document).collect();
        assert!(docs[0].content.ends_with("(mapped)"));
    }

    #[test]
    fn test_take_and_drop() {
        let taken = loader(&["a", "b", "c"]).take(2);
        assert_eq!(taken.load().count(), 2);
        assert_eq!(taken.estimated_count(), Some(2));

        let dropped = loader(&["a", "b", "c"]).drop(2);
        let docs: Vec<Document> = dropped.load().filter_map(LoadResult::document).collect();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "c");
    }

    #[test]
    fn test_with_metadata_applies_to_every_document() {
        let tagged = loader(&["a", "b"]).with_metadata("origin", "unit-test");
        for doc in tagged.load().filter_map(LoadResult::document) {
            assert_eq!(doc.metadata.get("origin").map(String::as_str), Some("unit-test"));
        }
    }

    #[test]
    fn test_with_hints() {
        let hinted = loader(&["a"]).with_hints(DocumentHints {
            skip_chunking: true,
            ..Default::default()
        });
        let docs: Vec<Document> = hinted.load().filter_map(LoadResult::document).collect();
        assert!(docs[0].hints.as_ref().unwrap().skip_chunking);
    }

    #[test]
    fn test_combine_chains_streams() {
        let combined = loader(&["a"]).combine(loader(&["b", "c"]));
        let ids: Vec<String> = combined
            .load()
            .filter_map(LoadResult::document)
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(combined.estimated_count(), Some(3));
    }

    #[test]
    fn test_combinators_compose() {
        let composed = loader(&["a", "b", "c", "d"])
            .filter(|d| d.id != "a")
            .with_metadata("stage", "composed")
            .take(3);
        let docs: Vec<Document> = composed.load().filter_map(LoadResult::document).collect();
        assert_eq!(docs.len(), 2);
    }
}
