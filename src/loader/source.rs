//! Adapter from the [`DocumentSource`] collaborator boundary to a loader.

use crate::document::{Document, DocumentSource};
use crate::error::QuarryError;
use crate::loader::{DocumentLoader, LoadResult};

/// A loader that reads every document listed by a [`DocumentSource`].
///
/// Listing failures surface as one `Failure` item; per-document read
/// failures are per-item and do not stop the stream. Content must decode
/// as UTF-8. Document ids are the source-relative paths; a
/// source-provided etag is carried into the computed version.
pub struct SourceBackedLoader<S: DocumentSource> {
    source: S,
}

impl<S: DocumentSource> SourceBackedLoader<S> {
    /// Wrap a source.
    pub fn new(source: S) -> Self {
        SourceBackedLoader { source }
    }
}

impl<S: DocumentSource> DocumentLoader for SourceBackedLoader<S> {
    fn load(&self) -> Box<dyn Iterator<Item = LoadResult> + '_> {
        let refs = match self.source.list_documents() {
            Ok(refs) => refs,
            Err(error) => {
                return Box::new(std::iter::once(LoadResult::Failure {
                    source: self.source.description(),
                    error,
                }));
            }
        };

        let description = self.source.description();
        Box::new(refs.into_iter().map(move |listed| {
            let reference = match listed {
                Ok(reference) => reference,
                Err(error) => {
                    return LoadResult::Failure {
                        source: description.clone(),
                        error,
                    };
                }
            };
            let path = reference.path.clone();
            match self.source.read_document(&reference) {
                Ok(raw) => match String::from_utf8(raw.content) {
                    Ok(content) => {
                        let mut doc = Document::new(&path, content)
                            .with_metadata("source", description.clone());
                        if let Some(content_type) = raw.content_type {
                            doc = doc.with_metadata("content_type", content_type);
                        }
                        if let Some(etag) = reference.etag {
                            doc.version = doc.version.map(|v| v.with_etag(etag));
                        }
                        LoadResult::Success(doc)
                    }
                    Err(e) => LoadResult::Failure {
                        source: path,
                        error: QuarryError::processing(format!("content is not UTF-8: {e}")),
                    },
                },
                Err(error) => LoadResult::Failure { source: path, error },
            }
        }))
    }

    fn description(&self) -> String {
        self.source.description()
    }

    fn estimated_count(&self) -> Option<usize> {
        self.source.estimated_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentRef, RawDocument};
    use crate::error::Result;
    use crate::loader::LoadStats;

    struct FakeSource {
        docs: Vec<(String, Vec<u8>)>,
    }

    impl DocumentSource for FakeSource {
        fn list_documents(&self) -> Result<Vec<Result<DocumentRef>>> {
            Ok(self
                .docs
                .iter()
                .map(|(path, _)| Ok(DocumentRef::new(path.clone())))
                .collect())
        }

        fn read_document(&self, reference: &DocumentRef) -> Result<RawDocument> {
            self.docs
                .iter()
                .find(|(path, _)| path == &reference.path)
                .map(|(_, content)| RawDocument {
                    reference: reference.clone(),
                    content: content.clone(),
                    content_type: Some("text/plain".to_string()),
                })
                .ok_or_else(|| QuarryError::not_found(reference.path.clone()))
        }

        fn description(&self) -> String {
            "fake source".to_string()
        }

        fn estimated_count(&self) -> Option<usize> {
            Some(self.docs.len())
        }
    }

    #[test]
    fn test_loads_listed_documents() {
        let loader = SourceBackedLoader::new(FakeSource {
            docs: vec![
                ("a.txt".to_string(), b"alpha".to_vec()),
                ("b.txt".to_string(), b"beta".to_vec()),
            ],
        });

        let docs: Vec<Document> = loader.load().filter_map(LoadResult::document).collect();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a.txt");
        assert_eq!(docs[0].content, "alpha");
        assert_eq!(loader.estimated_count(), Some(2));
    }

    #[test]
    fn test_invalid_utf8_is_a_per_item_failure() {
        let loader = SourceBackedLoader::new(FakeSource {
            docs: vec![
                ("good.txt".to_string(), b"fine".to_vec()),
                ("bad.bin".to_string(), vec![0xff, 0xfe, 0x00]),
            ],
        });

        let stats = LoadStats::collect(loader.load());
        assert_eq!(stats.loaded, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.errors[0].0, "bad.bin");
    }
}
