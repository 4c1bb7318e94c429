//! Long-term conversational memory, partitioned by user

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::embedding::{normalize, Embedder};
use crate::error::Result;
use crate::storage::{MemoryBackend, ScoredMemory};

/// Kind tag for entries written back after completed turns
pub const KIND_CONVERSATION: &str = "conversation";

/// A long-term memory entry
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub text: String,
    pub user_id: String,
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(
        text: impl Into<String>,
        user_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            user_id: user_id.into(),
            kind: kind.into(),
            timestamp,
        }
    }
}

/// The long-term memory store.
///
/// Independent of the document index: its own persistence location and
/// its own embedding space. Entries are created solely by the write-back
/// step after a completed turn.
pub struct LongTermMemory {
    backend: MemoryBackend,
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl LongTermMemory {
    /// Open (or create) the memory store at the given path
    pub async fn open(path: &Path, embedder: Arc<dyn Embedder>, min_score: f32) -> Result<Self> {
        let backend = MemoryBackend::open(path, embedder.dimensions()).await?;

        Ok(Self {
            backend,
            embedder,
            min_score,
        })
    }

    /// Embed and store one entry
    pub async fn add(
        &self,
        text: &str,
        user_id: &str,
        timestamp: DateTime<Utc>,
        kind: &str,
    ) -> Result<MemoryEntry> {
        let embedding = normalize(self.embedder.embed(text).await?);
        let entry = MemoryEntry::new(text, user_id, timestamp, kind);
        self.backend.insert(&entry, &embedding).await?;

        tracing::debug!(user_id, kind, "stored long-term memory entry");
        Ok(entry)
    }

    /// Write back one completed conversation turn
    pub async fn remember_turn(
        &self,
        user_text: &str,
        assistant_text: &str,
        user_id: &str,
    ) -> Result<MemoryEntry> {
        let text = format!("User: {}\nAssistant: {}", user_text, assistant_text);
        self.add(&text, user_id, Utc::now(), KIND_CONVERSATION).await
    }

    /// Top-k entries for a query, restricted to one user's partition
    pub async fn search(&self, query: &str, k: usize, user_id: &str) -> Result<Vec<ScoredMemory>> {
        let query_embedding = normalize(self.embedder.embed(query).await?);
        self.backend
            .search(&query_embedding, k, self.min_score, user_id)
            .await
    }
}
