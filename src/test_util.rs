//! Shared test doubles for the embedding and generation boundaries

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::embedding::{normalize, Embedder};
use crate::error::{Error, Result};
use crate::generation::{FragmentStream, Generator};

/// Deterministic embedder: identical text always maps to the identical
/// unit vector, distinct texts land elsewhere.
pub struct StubEmbedder {
    dimensions: usize,
}

impl StubEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let value = (hasher.finish() % 2000) as f32 / 1000.0 - 1.0;
            vector.push(value);
        }
        Ok(normalize(vector))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Embedder that always fails, for unreachable-store scenarios
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("embedding service unreachable"))
    }

    fn dimensions(&self) -> usize {
        8
    }
}

/// Generator that replays a fixed fragment script, optionally cancelling
/// a token after the nth fragment is produced.
pub struct ScriptedGenerator {
    fragments: Vec<String>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedGenerator {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            cancel_after: None,
        }
    }

    pub fn cancelling_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<FragmentStream> {
        let cancel_after = self.cancel_after.clone();
        let stream = stream::iter(self.fragments.clone().into_iter().enumerate()).map(
            move |(i, fragment)| {
                if let Some((n, token)) = &cancel_after {
                    if i + 1 == *n {
                        token.cancel();
                    }
                }
                Ok::<_, Error>(fragment)
            },
        );

        Ok(Box::pin(stream))
    }
}
