//! # Lara Memory
//!
//! Hybrid, tiered memory and retrieval system supplying grounding context
//! to a conversational generation service.
//!
//! ## Architecture
//!
//! Retrieval is split across independent tiers:
//! - **Document corpus** - flat vector index over ingested chunks,
//!   correlated with a SQLite metadata store
//! - **Long-term memory** - a second vector store over past conversation
//!   turns, partitioned by user, in its own embedding space
//! - **Session history** - ordered, append-only turn log with bounded
//!   recent-history windows
//!
//! A per-query routing policy decides what context to assemble: long-term
//! memory is always consulted, the document index only when a trigger
//! phrase asks for it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lara_memory::{ChatEngine, Config, DocumentStore, Ingestor, LongTermMemory};
//!
//! let config = Config::default();
//! let mut documents = DocumentStore::open(&config, doc_embedder)?;
//!
//! // Populate the corpus (once, before serving queries)
//! Ingestor::new(&config).ingest("rag".as_ref(), &mut documents).await?;
//!
//! // Answer queries
//! let mut engine = ChatEngine::new(&config, generator, Some(documents), memory, log, "user");
//! let outcome = engine.respond("what do the documents say?", &cancel).await?;
//! ```

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod memory;
pub mod router;
pub mod session;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_util;

pub use config::Config;
pub use corpus::{DocumentHit, DocumentStore};
pub use embedding::{normalize, Embedder, FastembedEmbedder};
pub use engine::{ChatEngine, TurnOutcome};
pub use error::{Error, Result};
pub use generation::{collect_fragments, FragmentStream, GenerationOutcome, Generator};
pub use ingest::{Ingestor, IngestReport, LoaderRegistry, TextChunker};
pub use memory::{LongTermMemory, MemoryEntry};
pub use router::{AssembledContext, ContextRouter, DocumentGate, TriggerPhraseGate};
pub use session::{Role, Session, Turn};
pub use storage::{ScoredMemory, TurnLog};
