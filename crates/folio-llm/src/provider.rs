use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the LLM and return the assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<String, crate::LlmError>> + Send;

    /// Embed a text into a vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider does not support embeddings or the call fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, crate::LlmError>> + Send;

    fn supports_embeddings(&self) -> bool;

    fn name(&self) -> &'static str;
}
