//! Embedding generation using fastembed (local, no API keys)

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Boundary for the external embedding service.
///
/// Each store owns its own `Embedder`; vectors from different embedding
/// identities must never land in the same store.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Fixed output dimension of this embedder
    fn dimensions(&self) -> usize;
}

/// Embedding service backed by a local fastembed model
pub struct FastembedEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    dimensions: usize,
}

impl FastembedEmbedder {
    /// Create a new embedder for a named model.
    ///
    /// Models download automatically on first use to ~/.cache/fastembed.
    pub fn new(model_name: &str, dimensions: usize) -> Result<Self> {
        let model = match model_name {
            "all-MiniLM-L6-v2" => EmbeddingModel::AllMiniLML6V2,
            "BGE-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            other => {
                return Err(Error::config(format!(
                    "Unknown embedding model: {}",
                    other
                )))
            }
        };

        let model = TextEmbedding::try_new(
            InitOptions::new(model).with_show_download_progress(true),
        )
        .map_err(|e| Error::embedding(format!("Failed to load embedding model: {}", e)))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for FastembedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let model = self.model.clone();
        let text = text.to_string();

        let mut guard = model.lock().await;
        let embeddings = guard
            .embed(vec![text], None)
            .map_err(|e| Error::embedding(format!("Embedding failed: {}", e)))?;

        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("No embedding returned"))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// L2-normalize a vector. Zero-norm vectors pass through unchanged.
pub fn normalize(vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector;
    }
    vector.into_iter().map(|v| v / norm).collect()
}
