//! Generation service boundary and cooperative stream consumption

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A finite, lazily produced sequence of response fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Boundary for the external generation service
#[async_trait]
pub trait Generator: Send + Sync {
    /// Start generating a response for the prompt
    async fn generate(&self, prompt: &str) -> Result<FragmentStream>;
}

/// Outcome of consuming a generation stream
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    /// The concatenation of every fragment actually produced
    pub text: String,

    /// Whether the stream was truncated by cancellation
    pub interrupted: bool,
}

/// Consume a fragment stream, checking for cancellation between fragment
/// emissions.
///
/// Cancellation truncates the stream; only fragments already produced end
/// up in the outcome, never unproduced continuation text. There is no
/// automatic retry. `on_fragment` sees each fragment as it arrives, for
/// incremental display.
pub async fn collect_fragments<F>(
    mut stream: FragmentStream,
    cancel: &CancellationToken,
    mut on_fragment: F,
) -> Result<GenerationOutcome>
where
    F: FnMut(&str),
{
    let mut text = String::new();
    let mut interrupted = false;

    loop {
        if cancel.is_cancelled() {
            interrupted = true;
            break;
        }

        match stream.next().await {
            Some(fragment) => {
                let fragment = fragment?;
                on_fragment(&fragment);
                text.push_str(&fragment);
            }
            None => break,
        }
    }

    if interrupted {
        tracing::info!(produced = text.len(), "generation interrupted");
    }

    Ok(GenerationOutcome { text, interrupted })
}
