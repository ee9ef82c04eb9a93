//! Document model shared by loaders, the registry, and the sync engine.
//!
//! A [`Document`] is an already-chunked unit of ingestable text with
//! string metadata. Its [`DocumentVersion`] carries a content-addressed
//! hash used as the sole change-detection signal: equal content always
//! produces an equal hash, so the sync engine never compares full bodies.
//!
//! [`DocumentSource`] is the collaborator boundary for remote stores: any
//! object store or API that can list references and read raw bytes plugs
//! into the sync pipeline through it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An ingestable unit of text with metadata and an optional version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique document id.
    pub id: String,
    /// The document's text content.
    pub content: String,
    /// String key/value metadata.
    pub metadata: HashMap<String, String>,
    /// Optional chunking/skip hints consumed by external chunkers.
    pub hints: Option<DocumentHints>,
    /// Optional content version for change detection.
    pub version: Option<DocumentVersion>,
}

impl Document {
    /// Create a document with a content hash computed from its content.
    pub fn new<I: Into<String>, C: Into<String>>(id: I, content: C) -> Self {
        let content = content.into();
        let version = DocumentVersion::of_content(&content);
        Document {
            id: id.into(),
            content,
            metadata: HashMap::new(),
            hints: None,
            version: Some(version),
        }
    }

    /// Attach a metadata key/value pair.
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach chunking hints.
    pub fn with_hints(mut self, hints: DocumentHints) -> Self {
        self.hints = Some(hints);
        self
    }

    /// The document's version, computing one from content when absent.
    pub fn version_or_computed(&self) -> DocumentVersion {
        self.version
            .clone()
            .unwrap_or_else(|| DocumentVersion::of_content(&self.content))
    }
}

/// Chunking and skip hints attached to a document.
///
/// Consumed by external chunkers; the retrieval layer carries them
/// through loaders untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentHints {
    /// Preferred chunk size in characters, when the source knows better
    /// than the chunker's default.
    pub chunk_size: Option<usize>,
    /// Preferred overlap between adjacent chunks, in characters.
    pub chunk_overlap: Option<usize>,
    /// Skip chunking entirely and index the document as one unit.
    pub skip_chunking: bool,
}

/// A content-addressed fingerprint of a document used for change detection.
///
/// Invariant: equal content produces an equal `content_hash`. Hash
/// collisions are treated as impossible within this subsystem's scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// Hex-encoded blake3 hash of the raw content bytes.
    pub content_hash: String,
    /// Unix timestamp (seconds) when the version was observed, if known.
    pub timestamp: Option<i64>,
    /// Source-provided entity tag, if any.
    pub etag: Option<String>,
}

impl DocumentVersion {
    /// Compute a version from raw content, stamped with the current time.
    pub fn of_content(content: &str) -> Self {
        DocumentVersion {
            content_hash: blake3::hash(content.as_bytes()).to_hex().to_string(),
            timestamp: Some(chrono::Utc::now().timestamp()),
            etag: None,
        }
    }

    /// Attach a source-provided etag.
    pub fn with_etag<S: Into<String>>(mut self, etag: S) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Whether two versions refer to identical content.
    pub fn same_content(&self, other: &DocumentVersion) -> bool {
        self.content_hash == other.content_hash
    }
}

/// A reference to a document in a [`DocumentSource`], before it is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Source-relative path or key identifying the document.
    pub path: String,
    /// Content length in bytes, when the source reports it.
    pub content_length: Option<u64>,
    /// Source-provided entity tag, if any.
    pub etag: Option<String>,
    /// Last-modified unix timestamp (seconds), if known.
    pub last_modified: Option<i64>,
}

impl DocumentRef {
    /// Create a reference from a path alone.
    pub fn new<P: Into<String>>(path: P) -> Self {
        DocumentRef {
            path: path.into(),
            content_length: None,
            etag: None,
            last_modified: None,
        }
    }
}

/// Raw bytes read from a [`DocumentSource`], not yet decoded.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// The reference this content was read from.
    pub reference: DocumentRef,
    /// Raw content bytes.
    pub content: Vec<u8>,
    /// Content type reported by the source, if any.
    pub content_type: Option<String>,
}

/// Collaborator boundary: a remote store of documents.
///
/// Any object store or API can be adapted to this shape to plug into the
/// sync engine via `SourceBackedLoader`.
pub trait DocumentSource: Send + Sync {
    /// List all document references currently in the source.
    fn list_documents(&self) -> Result<Vec<Result<DocumentRef>>>;

    /// Read the raw content behind a reference.
    fn read_document(&self, reference: &DocumentRef) -> Result<RawDocument>;

    /// Human-readable description of the source.
    fn description(&self) -> String;

    /// Best-effort count of documents, when knowable.
    fn estimated_count(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_content_equal_hash() {
        let a = DocumentVersion::of_content("the same content");
        let b = DocumentVersion::of_content("the same content");
        assert!(a.same_content(&b));
        assert_eq!(a.content_hash, b.content_hash);
    }

    #[test]
    fn test_different_content_different_hash() {
        let a = DocumentVersion::of_content("one thing");
        let b = DocumentVersion::of_content("another thing");
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_document_new_computes_version() {
        let doc = Document::new("doc-1", "hello world");
        let version = doc.version.as_ref().unwrap();
        assert_eq!(
            version.content_hash,
            blake3::hash(b"hello world").to_hex().to_string()
        );
    }

    #[test]
    fn test_document_builder_metadata() {
        let doc = Document::new("doc-1", "body")
            .with_metadata("lang", "rust")
            .with_metadata("kind", "guide");
        assert_eq!(doc.metadata.get("lang").map(String::as_str), Some("rust"));
        assert_eq!(doc.metadata.len(), 2);
    }
}
