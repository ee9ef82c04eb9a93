//! Document registry: the record of what is currently indexed.
//!
//! A [`DocumentRegistry`] maps document ids to their last-indexed
//! [`DocumentVersion`]. It is the single source of truth for "what is in
//! the indices" and is mutated only by the sync engine. Loaders and
//! stores never touch it, so the indices and the registry cannot diverge
//! silently.
//!
//! Two implementations: [`InMemoryRegistry`] and [`JsonFileRegistry`],
//! which snapshots to a JSON file through an atomic temp-file rename.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;

use parking_lot::RwLock;

use crate::document::DocumentVersion;
use crate::error::{QuarryError, Result};

/// A mapping from document id to last-indexed version.
///
/// All operations are total: registering an existing id replaces its
/// version, unregistering a missing id is a no-op. Only storage-layer
/// I/O can fail.
pub trait DocumentRegistry: Send + Sync {
    /// Record (or replace) the version indexed for `id`.
    fn register(&self, id: &str, version: DocumentVersion) -> Result<()>;

    /// The version last indexed for `id`, if any.
    fn get_version(&self, id: &str) -> Result<Option<DocumentVersion>>;

    /// Forget `id`; a no-op when absent.
    fn unregister(&self, id: &str) -> Result<()>;

    /// All currently registered ids.
    fn all_document_ids(&self) -> Result<BTreeSet<String>>;

    /// Forget everything.
    fn clear(&self) -> Result<()>;
}

/// A registry held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: RwLock<HashMap<String, DocumentVersion>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        InMemoryRegistry::default()
    }
}

impl DocumentRegistry for InMemoryRegistry {
    fn register(&self, id: &str, version: DocumentVersion) -> Result<()> {
        self.entries.write().insert(id.to_string(), version);
        Ok(())
    }

    fn get_version(&self, id: &str) -> Result<Option<DocumentVersion>> {
        Ok(self.entries.read().get(id).cloned())
    }

    fn unregister(&self, id: &str) -> Result<()> {
        self.entries.write().remove(id);
        Ok(())
    }

    fn all_document_ids(&self) -> Result<BTreeSet<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}

/// A registry persisted as a JSON snapshot on every mutation.
///
/// The snapshot is written to a sibling temp file and renamed into
/// place, so a crash mid-write never leaves a truncated registry.
#[derive(Debug)]
pub struct JsonFileRegistry {
    path: PathBuf,
    entries: RwLock<HashMap<String, DocumentVersion>>,
}

impl JsonFileRegistry {
    /// Open a registry at `path`, loading the existing snapshot when
    /// present.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(QuarryError::from(e)),
        };
        Ok(JsonFileRegistry {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, DocumentVersion>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DocumentRegistry for JsonFileRegistry {
    fn register(&self, id: &str, version: DocumentVersion) -> Result<()> {
        let mut entries = self.entries.write();
        entries.insert(id.to_string(), version);
        self.persist(&entries)
    }

    fn get_version(&self, id: &str) -> Result<Option<DocumentVersion>> {
        Ok(self.entries.read().get(id).cloned())
    }

    fn unregister(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.remove(id).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn all_document_ids(&self) -> Result<BTreeSet<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write();
        entries.clear();
        self.persist(&entries)
    }
}
