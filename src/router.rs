//! Context routing: decide per query what grounding context to assemble.
//!
//! Long-term memory is always consulted. The document index is gated
//! behind a binary classifier; the default implementation matches a fixed
//! trigger-phrase set against the lowercased query. The assembled output
//! keeps both sections present whatever the gate decides, so the prompt
//! template's structure never changes shape.

use crate::config::Config;
use crate::corpus::{DocumentHit, DocumentStore};
use crate::error::Result;
use crate::memory::LongTermMemory;
use crate::storage::ScoredMemory;

/// Trigger phrases meaning "consult the documents"
pub const DEFAULT_TRIGGER_PHRASES: &[&str] = &[
    "in the documents",
    "from the documents",
    "according to the documents",
    "search the documents",
    "check the documents",
    "based on the documents",
    "in the docs",
    "from the docs",
    "in the files",
    "from the files",
];

/// Binary classifier deciding whether a query should consult the
/// document index
pub trait DocumentGate: Send + Sync {
    fn should_consult(&self, query: &str) -> bool;
}

/// Gate matching a fixed set of trigger phrases against the lowercased
/// query
pub struct TriggerPhraseGate {
    phrases: Vec<String>,
}

impl TriggerPhraseGate {
    pub fn new(phrases: &[&str]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }
}

impl Default for TriggerPhraseGate {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER_PHRASES)
    }
}

impl DocumentGate for TriggerPhraseGate {
    fn should_consult(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.phrases.iter().any(|phrase| query.contains(phrase))
    }
}

/// Context assembled for one query
#[derive(Debug, Clone)]
pub struct AssembledContext {
    /// Document hits, in rank order (empty when the gate declined or the
    /// index is empty)
    pub document_hits: Vec<DocumentHit>,

    /// Long-term memory hits, in rank order
    pub memory_hits: Vec<ScoredMemory>,

    /// Whether the gate decided to consult the documents
    pub documents_consulted: bool,
}

impl AssembledContext {
    /// Render both context sections for prompt injection.
    ///
    /// Both headings are always emitted, an empty section stays empty
    /// under its heading.
    pub fn format_for_prompt(&self) -> String {
        let mut parts = Vec::new();

        parts.push("## Document context\n".to_string());
        for hit in &self.document_hits {
            parts.push(format!("- [{}] {}\n", hit.source, hit.content));
        }

        parts.push("\n## Historical context\n".to_string());
        for memory in &self.memory_hits {
            parts.push(format!("- {}\n", memory.text));
        }

        parts.join("")
    }
}

/// Per-query routing policy
pub struct ContextRouter {
    gate: Box<dyn DocumentGate>,
    doc_top_k: usize,
    memory_top_k: usize,
}

impl ContextRouter {
    /// Create a router with the default trigger-phrase gate
    pub fn new(config: &Config) -> Self {
        Self {
            gate: Box::new(TriggerPhraseGate::default()),
            doc_top_k: config.doc_top_k,
            memory_top_k: config.memory_top_k,
        }
    }

    /// Substitute another gate implementation
    pub fn with_gate(mut self, gate: Box<dyn DocumentGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Assemble the context for one query.
    ///
    /// Long-term memory is always queried; a memory store failure is
    /// fatal for this query. Document retrieval runs only when the gate
    /// fires and a store is attached; a missing or empty index yields an
    /// empty document section, silently.
    pub async fn assemble(
        &self,
        query: &str,
        documents: Option<&DocumentStore>,
        memory: &LongTermMemory,
        user_id: &str,
    ) -> Result<AssembledContext> {
        let documents_consulted = self.gate.should_consult(query);

        let document_hits = match (documents_consulted, documents) {
            (true, Some(store)) => store.search(query, self.doc_top_k).await?,
            _ => Vec::new(),
        };

        let memory_hits = memory.search(query, self.memory_top_k, user_id).await?;

        tracing::debug!(
            documents_consulted,
            document_hits = document_hits.len(),
            memory_hits = memory_hits.len(),
            "assembled context"
        );

        Ok(AssembledContext {
            document_hits,
            memory_hits,
            documents_consulted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{FailingEmbedder, StubEmbedder};
    use crate::Error;
    use std::sync::Arc;

    #[test]
    fn gate_fires_on_trigger_phrases_case_insensitively() {
        let gate = TriggerPhraseGate::default();
        assert!(gate.should_consult("what does it say In The Documents about llamas?"));
        assert!(gate.should_consult("search the documents for llamas"));
        assert!(!gate.should_consult("tell me about llamas"));
    }

    async fn router_fixture() -> (tempfile::TempDir, Config, DocumentStore, LongTermMemory) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(dir.path());
        config.ensure_dirs().unwrap();

        let documents =
            DocumentStore::open(&config, Arc::new(StubEmbedder::new(8))).unwrap();
        let memory = LongTermMemory::open(
            &config.memory_db_path(),
            Arc::new(StubEmbedder::new(8)),
            0.0,
        )
        .await
        .unwrap();

        (dir, config, documents, memory)
    }

    #[tokio::test]
    async fn trigger_query_yields_populated_document_section() {
        let (_dir, config, mut documents, memory) = router_fixture().await;
        documents.append_chunk("a.txt", "llamas are camelids").await.unwrap();

        let router = ContextRouter::new(&config);
        let context = router
            .assemble("what is in the documents about llamas?", Some(&documents), &memory, "alice")
            .await
            .unwrap();

        assert!(context.documents_consulted);
        assert!(!context.document_hits.is_empty());

        let rendered = context.format_for_prompt();
        assert!(rendered.contains("## Document context"));
        assert!(rendered.contains("llamas are camelids"));
    }

    #[tokio::test]
    async fn ungated_query_keeps_an_explicitly_empty_document_section() {
        let (_dir, config, mut documents, memory) = router_fixture().await;
        documents.append_chunk("a.txt", "llamas are camelids").await.unwrap();

        let router = ContextRouter::new(&config);
        let context = router
            .assemble("tell me about llamas", Some(&documents), &memory, "alice")
            .await
            .unwrap();

        assert!(!context.documents_consulted);
        assert!(context.document_hits.is_empty());

        let rendered = context.format_for_prompt();
        assert!(rendered.contains("## Document context"));
        assert!(rendered.contains("## Historical context"));
    }

    #[tokio::test]
    async fn absent_document_store_is_silently_empty() {
        let (_dir, config, _documents, memory) = router_fixture().await;

        let router = ContextRouter::new(&config);
        let context = router
            .assemble("search the documents for llamas", None, &memory, "alice")
            .await
            .unwrap();

        assert!(context.documents_consulted);
        assert!(context.document_hits.is_empty());
    }

    #[tokio::test]
    async fn memory_is_always_queried_and_rendered_in_rank_order() {
        let (_dir, config, documents, memory) = router_fixture().await;
        memory
            .add("User: hi\nAssistant: hello", "alice", chrono::Utc::now(), "conversation")
            .await
            .unwrap();

        let router = ContextRouter::new(&config);
        let context = router
            .assemble("User: hi\nAssistant: hello", Some(&documents), &memory, "alice")
            .await
            .unwrap();

        assert!(!context.memory_hits.is_empty());
        assert!(context.format_for_prompt().contains("User: hi"));
    }

    #[tokio::test]
    async fn unreachable_memory_store_is_fatal_for_the_query() {
        let (_dir, config, documents, _memory) = router_fixture().await;

        let broken_dir = tempfile::tempdir().unwrap();
        let broken_memory = LongTermMemory::open(
            broken_dir.path(),
            Arc::new(FailingEmbedder),
            0.0,
        )
        .await
        .unwrap();

        let router = ContextRouter::new(&config);
        let result = router
            .assemble("tell me about llamas", Some(&documents), &broken_memory, "alice")
            .await;

        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    #[tokio::test]
    async fn identical_query_and_snapshot_produce_identical_output() {
        let (_dir, config, mut documents, memory) = router_fixture().await;
        documents.append_chunk("a.txt", "llamas are camelids").await.unwrap();
        documents.append_chunk("b.txt", "alpacas are too").await.unwrap();

        let router = ContextRouter::new(&config);
        let first = router
            .assemble("check the documents: llamas", Some(&documents), &memory, "alice")
            .await
            .unwrap()
            .format_for_prompt();
        let second = router
            .assemble("check the documents: llamas", Some(&documents), &memory, "alice")
            .await
            .unwrap()
            .format_for_prompt();

        assert_eq!(first, second);
    }
}
