//! Storage backends for lara-memory

mod index;
mod jsonl;
pub mod lance;
mod sqlite;

pub use index::FlatIndex;
pub use jsonl::TurnLog;
pub use lance::{MemoryBackend, ScoredMemory};
pub use sqlite::{ChunkRecord, MetadataStore};
