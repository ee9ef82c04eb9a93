//! Filesystem loaders: single files and directory trees.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::QuarryError;
use crate::loader::{DocumentLoader, LoadResult};

/// A loader producing one document from one file.
///
/// The document id is the path as given; file contents must be UTF-8.
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    /// Create a loader for the given file path.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileLoader { path: path.into() }
    }
}

impl DocumentLoader for FileLoader {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        Box::new(std::iter::once_with(|| load_file(&self.path, &self.path.to_string_lossy())))
    }

    fn description(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn estimated_count(&self) -> Option<usize> {
        Some(1)
    }
}

/// A loader producing one document per file under a directory.
///
/// Walks the tree lazily; document ids are paths relative to the root.
/// An extension allow-list skips non-matching files rather than failing
/// them.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
    extensions: Option<Vec<String>>,
    recursive: bool,
}

impl DirectoryLoader {
    /// Create a recursive loader for all files under `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        DirectoryLoader {
            root: root.into(),
            extensions: None,
            recursive: true,
        }
    }

    /// Restrict to files with one of the given extensions (no dot).
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = Some(
            extensions.into_iter().map(|e| e.to_lowercase()).collect(),
        );
        self
    }

    /// Only load files directly inside the root, not subdirectories.
    pub fn non_recursive(mut self) -> Self {
        self.recursive = false;
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        match &self.extensions {
            None => true,
            Some(allowed) => path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| allowed.contains(&e.to_lowercase()))
                .unwrap_or(false),
        }
    }
}

impl DocumentLoader for DirectoryLoader {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter();

        Box::new(walker.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(LoadResult::Failure {
                        source: self.root.to_string_lossy().into_owned(),
                        error: QuarryError::processing(format!("walk failed: {e}")),
                    });
                }
            };
            if !entry.file_type().is_file() {
                return None;
            }

            let path = entry.path();
            let id = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned();

            if !self.accepts(path) {
                debug!(path = %path.display(), "extension not allowed, skipping");
                return Some(LoadResult::Skipped {
                    source: id,
                    reason: "extension not in allow-list".to_string(),
                });
            }

            Some(load_file(path, &id))
        }))
    }

    fn description(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

fn load_file(path: &Path, id: &str) -> LoadResult {
    match fs::read_to_string(path) {
        Ok(content) => {
            let doc = Document::new(id, content)
                .with_metadata("source", path.to_string_lossy())
                .with_metadata(
                    "filename",
                    path.file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                );
            LoadResult::Success(doc)
        }
        Err(e) => LoadResult::Failure {
            source: id.to_string(),
            error: QuarryError::from(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadStats;
    use std::fs;

    #[test]
    fn test_file_loader_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        fs::write(&path, "file body").unwrap();

        let loader = FileLoader::new(&path);
        let docs: Vec<_> = loader.load().filter_map(LoadResult::document).collect();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "file body");
        assert_eq!(docs[0].metadata.get("filename").map(String::as_str), Some("note.txt"));
    }

    #[test]
    fn test_file_loader_missing_file_is_a_failure() {
        let loader = FileLoader::new("/definitely/not/here.txt");
        let stats = LoadStats::collect(loader.load());
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.loaded, 0);
    }

    #[test]
    fn test_directory_loader_relative_ids() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.md"), "top").unwrap();
        fs::write(dir.path().join("sub/b.md"), "nested").unwrap();

        let loader = DirectoryLoader::new(dir.path());
        let mut ids: Vec<String> = loader
            .load()
            .filter_map(LoadResult::document)
            .map(|d| d.id)
            .collect();
        ids.sort();

        assert_eq!(ids, vec!["a.md".to_string(), format!("sub{}b.md", std::path::MAIN_SEPARATOR)]);
    }

    #[test]
    fn test_directory_loader_extension_filter_skips() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.md"), "kept").unwrap();
        fs::write(dir.path().join("drop.bin"), "dropped").unwrap();

        let loader = DirectoryLoader::new(dir.path()).with_extensions(vec!["md".to_string()]);
        let stats = LoadStats::collect(loader.load());

        assert_eq!(stats.loaded, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_non_recursive_ignores_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("top.txt"), "top").unwrap();
        fs::write(dir.path().join("sub/deep.txt"), "deep").unwrap();

        let loader = DirectoryLoader::new(dir.path()).non_recursive();
        let docs: Vec<_> = loader.load().filter_map(LoadResult::document).collect();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "top.txt");
    }
}
