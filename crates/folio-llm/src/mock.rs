//! Test-only mock LLM provider.

use std::sync::{Arc, Mutex};

use crate::provider::{LlmProvider, Message};

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub embedding: Vec<f32>,
    pub supports_embeddings: bool,
    pub fail_chat: bool,
    pub fail_embed: bool,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            embedding: vec![0.0; 8],
            supports_embeddings: true,
            fail_chat: false,
            fail_embed: false,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    #[must_use]
    pub fn failing_embed(mut self) -> Self {
        self.fail_embed = true;
        self
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, _messages: &[Message]) -> Result<String, crate::LlmError> {
        if self.fail_chat {
            return Err(crate::LlmError::Other("mock LLM error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, crate::LlmError> {
        if self.fail_embed {
            return Err(crate::LlmError::Other("mock embed error".into()));
        }
        if self.supports_embeddings {
            Ok(self.embedding.clone())
        } else {
            Err(crate::LlmError::EmbedUnsupported { provider: "mock" })
        }
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
