pub mod ollama;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use ollama::OllamaProvider;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "system" | "user" | "assistant"
    pub content: String,
}

// Ordered conversation sent to the model
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub messages: Vec<Message>,
}

impl Prompt {
    // single-turn prompt, one user message
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            messages: vec![Message {
                role: "user".to_string(),
                content: message.into(),
            }],
        }
    }
}

// One partial response emitted while the model is generating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatChunk {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_at: Option<String>,
    pub content: String, // text since the previous chunk
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub done_reason: Option<String>,
}

pub type ChunkStream = BoxStream<'static, Result<ChatChunk, ProviderError>>;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    // chunks arrive lazily in generation order; the stream ends when the backend is done
    async fn stream(&self, prompt: Prompt) -> Result<ChunkStream, ProviderError>;
}
