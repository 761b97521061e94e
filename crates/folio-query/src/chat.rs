//! Cited chat: one retrieval and one generation per question, with inline
//! citations mapped back to the retrieved evidence.

use chrono::{DateTime, Utc};
use folio_llm::LlmProvider;
use folio_llm::provider::Message;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::QueryError;
use crate::evidence::CitationRef;
use crate::parse;
use crate::prompt;
use crate::retriever::Retriever;
use crate::retry::{RetryPolicy, with_retry};

const MIN_TOP_K: usize = 5;
const MAX_TOP_K: usize = 10;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Evidence chunks per question; clamped to 5..=10 at use.
    pub top_k: usize,
    /// Prior turns included as conversation context.
    pub history_turns: usize,
    pub retry: RetryPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            top_k: 8,
            history_turns: 2,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
    pub citations: Vec<CitationRef>,
    pub timestamp: DateTime<Utc>,
}

/// Append-only turn history owned by the calling session. The orchestrator
/// appends; prior turns are never mutated.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub(crate) fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }
}

pub struct CitedChat<P> {
    retriever: Retriever<P>,
    config: ChatConfig,
}

impl<P: LlmProvider> CitedChat<P> {
    pub fn new(retriever: Retriever<P>) -> Self {
        Self {
            retriever,
            config: ChatConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ChatConfig) -> Self {
        self.config = config;
        self
    }

    /// Answer one question with citations and append the turn to the
    /// conversation.
    ///
    /// Zero retrieved evidence is not a failure: the generation request
    /// states that nothing in the collection supports the question, and
    /// the turn comes back with an empty citation list. An answer without
    /// recognizable markers is likewise accepted uncited.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the token fires, or retrieval/LLM errors after
    /// local retries.
    pub async fn ask(
        &self,
        conversation: &mut Conversation,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatTurn, QueryError> {
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let top_k = self.config.top_k.clamp(MIN_TOP_K, MAX_TOP_K);
        let evidence = self.retriever.search(question, top_k, None).await?;
        tracing::debug!(question, evidence = evidence.len(), "chat retrieval complete");

        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let history: Vec<Message> = conversation
            .turns()
            .iter()
            .rev()
            .take(self.config.history_turns)
            .rev()
            .flat_map(|turn| {
                [
                    Message::user(turn.question.clone()),
                    Message::assistant(turn.answer.clone()),
                ]
            })
            .collect();

        let messages = prompt::chat_messages(question, &evidence, &history);
        let messages_ref = &messages;
        let answer = with_retry(&self.config.retry, "chat generation", || async move {
            self.retriever
                .provider()
                .chat(messages_ref)
                .await
                .map_err(QueryError::from)
        })
        .await?;

        let citations = parse::extract_citations(&answer, &evidence);
        if citations.is_empty() {
            tracing::warn!(question, "answer carried no recognizable citations");
        }

        let turn = ChatTurn {
            question: question.to_owned(),
            answer,
            citations,
            timestamp: Utc::now(),
        };
        conversation.push(turn.clone());
        Ok(turn)
    }
}
