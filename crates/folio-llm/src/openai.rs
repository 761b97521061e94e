//! OpenAI-compatible chat completion and embedding provider.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{LlmProvider, Message, Role};
use crate::retry::send_with_retry;

const MAX_RETRIES: u32 = 2;

#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        embedding_model: Option<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
            embedding_model,
            max_tokens,
            temperature,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn send_chat_request(&self, messages: &[Message]) -> Result<String, LlmError> {
        let api_messages: Vec<ApiMessage<'_>> = messages.iter().map(ApiMessage::from).collect();
        let body = ChatRequest {
            model: &self.model,
            messages: &api_messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = send_with_retry(self.name(), MAX_RETRIES, || {
            self.client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
        })
        .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!("chat completions error {status}: {text}");
            return Err(LlmError::Other(format!(
                "chat completions request failed (status {status})"
            )));
        }

        let resp: ChatResponse = serde_json::from_str(&text)?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse { provider: "openai" })
    }

    async fn send_embed_request(&self, model: &str, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbedRequest { model, input: text };

        let response = send_with_retry(self.name(), MAX_RETRIES, || {
            self.client
                .post(format!("{}/embeddings", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
        })
        .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!("embeddings error {status}: {text}");
            return Err(LlmError::Other(format!(
                "embeddings request failed (status {status})"
            )));
        }

        let resp: EmbedResponse = serde_json::from_str(&text)?;
        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(LlmError::EmptyResponse { provider: "openai" })
    }
}

impl LlmProvider for OpenAiProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.send_chat_request(messages).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let Some(model) = self.embedding_model.clone() else {
            return Err(LlmError::EmbedUnsupported { provider: "openai" });
        };
        self.send_embed_request(&model, text).await
    }

    fn supports_embeddings(&self) -> bool {
        self.embedding_model.is_some()
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for ApiMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role,
            content: &msg.content,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: String) -> OpenAiProvider {
        OpenAiProvider::new(
            "test-key".into(),
            base_url,
            "gpt-test".into(),
            Some("embed-test".into()),
            256,
            0.3,
        )
    }

    #[test]
    fn trailing_slash_stripped() {
        let p = provider("http://localhost:1234///".into());
        assert_eq!(p.base_url, "http://localhost:1234");
    }

    #[test]
    fn debug_redacts_api_key() {
        let p = provider("http://localhost".into());
        let dbg = format!("{p:?}");
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains("test-key"));
    }

    #[test]
    fn embeddings_unsupported_without_model() {
        let p = OpenAiProvider::new(
            "k".into(),
            "http://localhost".into(),
            "m".into(),
            None,
            256,
            0.3,
        );
        assert!(!p.supports_embeddings());
    }

    #[tokio::test]
    async fn chat_parses_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"model": "gpt-test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}]
            })))
            .mount(&server)
            .await;

        let p = provider(server.uri());
        let answer = p.chat(&[Message::user("hi")]).await.unwrap();
        assert_eq!(answer, "hello");
    }

    #[tokio::test]
    async fn chat_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let p = provider(server.uri());
        let result = p.chat(&[Message::user("hi")]).await;
        assert!(matches!(result, Err(LlmError::EmptyResponse { .. })));
    }

    #[tokio::test]
    async fn chat_server_error_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let p = provider(server.uri());
        let result = p.chat(&[Message::user("hi")]).await;
        assert!(matches!(result, Err(LlmError::Other(_))));
    }

    #[tokio::test]
    async fn embed_parses_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(
                serde_json::json!({"model": "embed-test", "input": "some text"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.2, 0.3]}]
            })))
            .mount(&server)
            .await;

        let p = provider(server.uri());
        let vector = p.embed("some text").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embed_without_model_fails_fast() {
        let p = OpenAiProvider::new(
            "k".into(),
            "http://127.0.0.1:1".into(),
            "m".into(),
            None,
            256,
            0.3,
        );
        let result = p.embed("text").await;
        assert!(matches!(result, Err(LlmError::EmbedUnsupported { .. })));
    }
}
