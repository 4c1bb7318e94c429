//! Document store: the vector index correlated with chunk metadata.
//!
//! Positions in the flat index and rows in the metadata store are written
//! in the same insertion order; the position-to-id mapping is rebuilt at
//! open time by reading metadata ids in insertion order. A length mismatch
//! between the two stores is a consistency fault and refuses to open.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{normalize, Embedder};
use crate::error::{Error, Result};
use crate::storage::{FlatIndex, MetadataStore};

/// A retrieved document chunk with its similarity score
#[derive(Debug, Clone)]
pub struct DocumentHit {
    pub position: usize,
    pub id: i64,
    pub source: String,
    pub content: String,
    pub score: f32,
}

/// Vector index plus metadata store for the ingested document corpus.
///
/// Single-writer discipline is encoded in the borrow rules: ingestion
/// appends through `&mut self`, search reads through `&self`.
pub struct DocumentStore {
    index: FlatIndex,
    metadata: MetadataStore,
    ids: Vec<i64>,
    embedder: Arc<dyn Embedder>,
    index_path: PathBuf,
}

impl DocumentStore {
    /// Open both stores and rebuild the position-to-id mapping
    pub fn open(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let metadata = MetadataStore::open(&config.sqlite_path())?;

        let index_path = config.index_path();
        let index = if index_path.exists() {
            FlatIndex::load(&index_path, embedder.dimensions())?
        } else {
            FlatIndex::new(embedder.dimensions())
        };

        let ids = metadata.ids_in_insertion_order()?;
        if ids.len() != index.len() {
            return Err(Error::inconsistent(format!(
                "Vector index holds {} vectors but metadata has {} rows",
                index.len(),
                ids.len()
            )));
        }

        Ok(Self {
            index,
            metadata,
            ids,
            embedder,
            index_path,
        })
    }

    /// Number of chunks in the store
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Embed, normalize, and append one chunk to both stores.
    ///
    /// Returns the id generated by the metadata store. Only the ingestion
    /// pipeline calls this.
    pub async fn append_chunk(&mut self, source: &str, content: &str) -> Result<i64> {
        let vector = normalize(self.embedder.embed(content).await?);

        let position = self.index.add(&vector)?;
        let id = self.metadata.insert_chunk(source, content)?;

        debug_assert_eq!(position, self.ids.len());
        self.ids.push(id);

        Ok(id)
    }

    /// Persist the vector index artifact.
    ///
    /// Metadata rows are durable on insert; a crash between an index write
    /// and the corresponding row leaves the stores inconsistent, which
    /// `open` detects and rejects.
    pub fn persist(&self) -> Result<()> {
        self.index.save(&self.index_path)
    }

    /// Search the corpus, resolving positions through ids to metadata rows.
    ///
    /// An empty store returns an empty result, not an error.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<DocumentHit>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = normalize(self.embedder.embed(query).await?);
        let scored = self.index.search(&query_vector, k)?;

        let mut hits = Vec::with_capacity(scored.len());
        for (position, score) in scored {
            let id = self
                .ids
                .get(position)
                .copied()
                .ok_or_else(|| Error::inconsistent(format!("No id at position {}", position)))?;

            let record = self.metadata.get_chunk(id)?.ok_or_else(|| {
                Error::inconsistent(format!("Metadata row missing for id {}", id))
            })?;

            hits.push(DocumentHit {
                position,
                id,
                source: record.source,
                content: record.content,
                score,
            });
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::StubEmbedder;

    fn store_fixture() -> (tempfile::TempDir, Config, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(dir.path());
        config.ensure_dirs().unwrap();
        let store = DocumentStore::open(&config, Arc::new(StubEmbedder::new(8))).unwrap();
        (dir, config, store)
    }

    #[tokio::test]
    async fn append_keeps_index_and_metadata_in_lockstep() {
        let (_dir, _config, mut store) = store_fixture();

        store.append_chunk("a.txt", "alpha").await.unwrap();
        store.append_chunk("a.txt", "beta").await.unwrap();
        store.append_chunk("b.txt", "gamma").await.unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.metadata.chunk_count().unwrap(), 3);
        assert_eq!(store.ids, store.metadata.ids_in_insertion_order().unwrap());
    }

    #[tokio::test]
    async fn search_resolves_hits_to_their_source_and_content() {
        let (_dir, _config, mut store) = store_fixture();

        store.append_chunk("a.txt", "the quick brown fox").await.unwrap();
        store.append_chunk("b.txt", "vector databases").await.unwrap();

        let hits = store.search("the quick brown fox", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, "a.txt");
        assert_eq!(hits[0].content, "the quick brown fox");
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn search_on_empty_store_returns_empty() {
        let (_dir, _config, store) = store_fixture();
        assert!(store.search("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reopen_rebuilds_position_to_id_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(dir.path());
        config.ensure_dirs().unwrap();
        let embedder = Arc::new(StubEmbedder::new(8));

        let ids = {
            let mut store = DocumentStore::open(&config, embedder.clone()).unwrap();
            let ids = vec![
                store.append_chunk("a.txt", "one").await.unwrap(),
                store.append_chunk("a.txt", "two").await.unwrap(),
            ];
            store.persist().unwrap();
            ids
        };

        let store = DocumentStore::open(&config, embedder).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.ids, ids);
    }

    #[tokio::test]
    async fn open_rejects_index_metadata_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(dir.path());
        config.ensure_dirs().unwrap();
        let embedder = Arc::new(StubEmbedder::new(8));

        {
            let mut store = DocumentStore::open(&config, embedder.clone()).unwrap();
            store.append_chunk("a.txt", "one").await.unwrap();
            store.append_chunk("a.txt", "two").await.unwrap();
            store.persist().unwrap();
        }

        // Simulate a crash that persisted fewer vectors than metadata rows
        let truncated = FlatIndex::new(8);
        truncated.save(&config.index_path()).unwrap();

        let result = DocumentStore::open(&config, embedder);
        assert!(matches!(result, Err(Error::Inconsistent(_))));
    }
}
