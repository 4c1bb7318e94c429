//! Turn orchestration: context assembly, generation, and write-back.
//!
//! One query is processed end-to-end before the next is accepted; that
//! discipline falls out of `respond` taking `&mut self`.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::corpus::DocumentStore;
use crate::error::Result;
use crate::generation::{collect_fragments, Generator};
use crate::memory::LongTermMemory;
use crate::router::ContextRouter;
use crate::session::{Role, Session};
use crate::storage::TurnLog;

/// Result of one completed (possibly cancelled) turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The assistant's response as actually produced
    pub response: String,

    /// Whether generation was cancelled mid-stream
    pub interrupted: bool,

    /// Whether the document index was consulted for this turn
    pub documents_consulted: bool,
}

/// Process-scoped handles for one conversation.
///
/// All collaborators are constructed once and passed in explicitly; there
/// are no ambient globals.
pub struct ChatEngine {
    router: ContextRouter,
    generator: Arc<dyn Generator>,
    documents: Option<DocumentStore>,
    memory: LongTermMemory,
    session: Session,
    turn_log: TurnLog,
    user_id: String,
    history_window: usize,
}

impl ChatEngine {
    pub fn new(
        config: &Config,
        generator: Arc<dyn Generator>,
        documents: Option<DocumentStore>,
        memory: LongTermMemory,
        turn_log: TurnLog,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            router: ContextRouter::new(config),
            generator,
            documents,
            memory,
            session: Session::new(),
            turn_log,
            user_id: user_id.into(),
            history_window: config.history_window,
        }
    }

    /// Replace the router (for a custom gate)
    pub fn with_router(mut self, router: ContextRouter) -> Self {
        self.router = router;
        self
    }

    /// The current session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Process one query end-to-end: assemble context, generate the
    /// response, then write the completed turn back into the session,
    /// the turn log, and long-term memory.
    ///
    /// A cancelled stream persists exactly the fragments produced.
    pub async fn respond(
        &mut self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome> {
        let context = self
            .router
            .assemble(query, self.documents.as_ref(), &self.memory, &self.user_id)
            .await?;

        let prompt = self.render_prompt(query, &context.format_for_prompt());

        let stream = self.generator.generate(&prompt).await?;
        let outcome = collect_fragments(stream, cancel, |_| {}).await?;

        let session_id = self.session.id();
        let user_turn = self.session.append(Role::User, query);
        self.turn_log.append(session_id, &user_turn)?;
        let assistant_turn = self.session.append(Role::Assistant, &outcome.text);
        self.turn_log.append(session_id, &assistant_turn)?;

        self.memory
            .remember_turn(query, &outcome.text, &self.user_id)
            .await?;

        Ok(TurnOutcome {
            response: outcome.text,
            interrupted: outcome.interrupted,
            documents_consulted: context.documents_consulted,
        })
    }

    fn render_prompt(&self, query: &str, context: &str) -> String {
        let mut prompt = String::new();
        prompt.push_str(context);
        prompt.push_str("\n## Recent turns\n");
        for turn in self.session.last_n(self.history_window) {
            prompt.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        prompt.push_str(&format!("\nUser: {}\nAssistant:", query));
        prompt
    }
}
