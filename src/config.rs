//! Configuration for lara-memory

use std::path::PathBuf;

/// Configuration for the memory and retrieval system
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for all storage
    pub data_dir: PathBuf,

    /// Chunk size for document splitting, in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks, in characters
    pub chunk_overlap: usize,

    /// Embedding model for the document index
    pub document_embedding_model: String,

    /// Embedding dimensions for the document index (384 for all-MiniLM-L6-v2)
    pub document_dimensions: usize,

    /// Embedding model for long-term memory (independent of the document space)
    pub memory_embedding_model: String,

    /// Embedding dimensions for long-term memory
    pub memory_dimensions: usize,

    /// How many document chunks to retrieve per query
    pub doc_top_k: usize,

    /// How many long-term memory entries to retrieve per query
    pub memory_top_k: usize,

    /// Minimum similarity score for long-term memory results (0.0 - 1.0)
    pub min_memory_score: f32,

    /// How many recent turns feed the chat-history window of the prompt
    pub history_window: usize,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lara-memory");

        Self {
            data_dir,
            chunk_size: 500,
            chunk_overlap: 50,
            document_embedding_model: "all-MiniLM-L6-v2".to_string(),
            document_dimensions: 384,
            memory_embedding_model: "BGE-small-en-v1.5".to_string(),
            memory_dimensions: 384,
            doc_top_k: 3,
            memory_top_k: 2,
            min_memory_score: 0.3,
            history_window: 10,
        }
    }
}

impl Config {
    /// Create a new config with a custom data directory
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Get the path to the document vector index artifact
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("vectors.bin")
    }

    /// Get the path to the SQLite metadata database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("metadata.db")
    }

    /// Get the path to the long-term memory database
    pub fn memory_db_path(&self) -> PathBuf {
        self.data_dir.join("memory")
    }

    /// Get the directory holding per-session turn logs
    pub fn session_log_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(self.memory_db_path())?;
        std::fs::create_dir_all(self.session_log_dir())?;
        Ok(())
    }
}
