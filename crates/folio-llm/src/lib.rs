//! LLM provider abstraction: chat completion and text embedding.

pub mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod openai;
pub mod provider;
mod retry;

pub use error::LlmError;
pub use provider::LlmProvider;
