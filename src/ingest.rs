//! Document ingestion pipeline: load, split, embed, store.
//!
//! The pipeline is the only writer to the document store. Per-document
//! load failures are logged and skipped; a corpus that yields zero chunks
//! is a configuration error. Re-running ingestion on unchanged input
//! appends duplicates — there is no implicit deduplication.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::corpus::DocumentStore;
use crate::error::{Error, Result};

/// One loaded document: raw text plus its source name
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub text: String,
    pub source: String,
}

/// Loads a single document from disk. Implementations handle one format;
/// dispatch happens by file extension in the [`LoaderRegistry`].
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<LoadedDocument>>;
}

/// Loader for plain-text formats (also covers source code files)
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> Result<Vec<LoadedDocument>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::load(format!("{}: {}", path.display(), e)))?;

        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(vec![LoadedDocument { text, source }])
    }
}

/// Registry dispatching loaders by lowercased file extension
pub struct LoaderRegistry {
    loaders: HashMap<String, Arc<dyn DocumentLoader>>,
}

impl LoaderRegistry {
    /// An empty registry
    pub fn empty() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Register a loader for an extension (without the dot)
    pub fn register(&mut self, extension: &str, loader: Arc<dyn DocumentLoader>) {
        self.loaders.insert(extension.to_lowercase(), loader);
    }

    /// Look up the loader for an extension
    pub fn get(&self, extension: &str) -> Option<&Arc<dyn DocumentLoader>> {
        self.loaders.get(&extension.to_lowercase())
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let text_loader: Arc<dyn DocumentLoader> = Arc::new(PlainTextLoader);
        for extension in ["txt", "md", "py", "rs"] {
            registry.register(extension, text_loader.clone());
        }
        registry
    }
}

/// Overlapping character-window splitter
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Split text into overlapping chunks. Always makes forward progress,
    /// even when overlap is at least the chunk size.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let size = self.chunk_size.max(1);
        let step = size.saturating_sub(self.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + size).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

/// Report of one ingestion run
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub documents_loaded: usize,
    pub documents_skipped: usize,
    pub chunks_ingested: usize,
}

/// The ingestion pipeline
pub struct Ingestor {
    registry: LoaderRegistry,
    chunker: TextChunker,
}

impl Ingestor {
    /// Create a pipeline with the default loader registry
    pub fn new(config: &Config) -> Self {
        Self {
            registry: LoaderRegistry::default(),
            chunker: TextChunker::new(config.chunk_size, config.chunk_overlap),
        }
    }

    /// Replace the loader registry
    pub fn with_registry(mut self, registry: LoaderRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Ingest every supported document under `folder` into the store.
    ///
    /// Documents that fail to load are logged and excluded; the batch
    /// continues. Zero chunks across the whole corpus is fatal. After the
    /// batch, the store is persisted.
    pub async fn ingest(&self, folder: &Path, store: &mut DocumentStore) -> Result<IngestReport> {
        if !folder.is_dir() {
            return Err(Error::config(format!(
                "Document folder not found: {}",
                folder.display()
            )));
        }

        let mut paths: Vec<_> = std::fs::read_dir(folder)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        let mut report = IngestReport::default();
        let mut pending: Vec<(String, String)> = Vec::new();

        for path in paths {
            let extension = match path.extension() {
                Some(ext) => ext.to_string_lossy().to_lowercase(),
                None => continue,
            };
            let Some(loader) = self.registry.get(&extension) else {
                tracing::debug!(path = %path.display(), "no loader for extension, skipping");
                continue;
            };

            match loader.load(&path) {
                Ok(documents) => {
                    report.documents_loaded += 1;
                    for document in documents {
                        for chunk in self.chunker.split(&document.text) {
                            pending.push((document.source.clone(), chunk));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping document");
                    report.documents_skipped += 1;
                }
            }
        }

        if pending.is_empty() {
            return Err(Error::config(format!(
                "Document corpus at {} produced no chunks",
                folder.display()
            )));
        }

        for (source, chunk) in pending {
            store.append_chunk(&source, &chunk).await?;
            report.chunks_ingested += 1;
        }

        store.persist()?;

        tracing::info!(
            loaded = report.documents_loaded,
            skipped = report.documents_skipped,
            chunks = report.chunks_ingested,
            "ingestion complete"
        );

        Ok(report)
    }
}
