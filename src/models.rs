use serde::{Deserialize, Serialize};

use crate::provider::Message;

// Ollama /api/generate request format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    #[serde(default)]
    pub stream: bool,
}

// Ollama /api/generate response format (non-streaming)
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GenerateResponse {
    pub model: String,
    pub response: String,
}

// Ollama /api/chat request format
#[derive(Serialize, Clone, Debug)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub stream: bool,
}

// One NDJSON line of a streaming /api/chat response
#[derive(Deserialize, Clone, Debug)]
pub struct ChatStreamLine {
    pub model: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
}

// Body of GET /ai/generate: the text plus exactly one of filePath / error
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenerationResult {
    pub generation: String,
    #[serde(rename = "filePath", skip_serializing_if = "Option::is_none", default)]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl GenerationResult {
    pub fn saved(generation: String, file_path: String) -> Self {
        Self {
            generation,
            file_path: Some(file_path),
            error: None,
        }
    }

    pub fn unsaved(generation: String, error: String) -> Self {
        Self {
            generation,
            file_path: None,
            error: Some(error),
        }
    }
}
