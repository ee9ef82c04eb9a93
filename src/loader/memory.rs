//! In-memory document loader for fixed lists.

use crate::document::Document;
use crate::loader::{DocumentLoader, LoadResult};

/// A loader over a fixed, in-memory list of documents.
///
/// Useful as a sync-engine input in tests and for callers that already
/// hold their documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    documents: Vec<Document>,
    description: String,
}

impl InMemoryLoader {
    /// Create a loader over the given documents.
    pub fn new(documents: Vec<Document>) -> Self {
        InMemoryLoader {
            documents,
            description: "in-memory documents".to_string(),
        }
    }

    /// Create a loader with a custom description.
    pub fn with_description<S: Into<String>>(documents: Vec<Document>, description: S) -> Self {
        InMemoryLoader {
            documents,
            description: description.into(),
        }
    }
}

impl DocumentLoader for InMemoryLoader {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        Box::new(self.documents.iter().cloned().map(LoadResult::Success))
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn estimated_count(&self) -> Option<usize> {
        Some(self.documents.len())
    }
}
