use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;

use super::{ChatChunk, ChunkStream, CompletionProvider, Prompt};
use crate::error::ProviderError;
use crate::load_balancer::LoadBalancer;
use crate::models::{ChatRequest, ChatStreamLine, GenerateRequest, GenerateResponse};

// Talks to one or more Ollama servers through the load balancer
pub struct OllamaProvider {
    client: reqwest::Client,
    load_balancer: Arc<LoadBalancer>,
    model: String,
}

impl OllamaProvider {
    pub fn new(client: reqwest::Client, load_balancer: Arc<LoadBalancer>, model: String) -> Self {
        Self {
            client,
            load_balancer,
            model,
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, ProviderError> {
        let backend = self.load_balancer.get_backend();
        let url = format!("{}{}", backend.url, path);
        tracing::debug!("[Ollama] POST {}", url);

        let res = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| {
                // health flags belong to the health checker; the next request tries again
                tracing::warn!("[Ollama] backend {} failed: {}", backend.url, source);
                ProviderError::Request {
                    url: url.clone(),
                    source,
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(ProviderError::Status { url, status });
        }
        Ok(res)
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let req = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let body: GenerateResponse = self
            .post("/api/generate", &req)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(body.response)
    }

    async fn stream(&self, prompt: Prompt) -> Result<ChunkStream, ProviderError> {
        let req = ChatRequest {
            model: &self.model,
            messages: &prompt.messages,
            stream: true,
        };
        let bytes = self.post("/api/chat", &req).await?.bytes_stream();

        Ok(Box::pin(decode_chat_stream(bytes)))
    }
}

// Lazily turns an NDJSON /api/chat body into chunks, stopping at the done line.
fn decode_chat_stream<S, B, E>(bytes: S) -> impl Stream<Item = Result<ChatChunk, ProviderError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::try_stream! {
        let mut decoder = LineDecoder::default();
        futures::pin_mut!(bytes);

        while let Some(part) = bytes.next().await {
            let part = part.map_err(|e| ProviderError::Decode(format!("stream interrupted: {}", e)))?;
            for line in decoder.push(part.as_ref()) {
                let chunk = parse_chat_line(&line)?;
                let done = chunk.done;
                yield chunk;
                if done {
                    return;
                }
            }
        }

        // body ended without a trailing newline
        if let Some(line) = decoder.finish() {
            yield parse_chat_line(&line)?;
        }
    }
}

// Splits an NDJSON byte stream into lines; bytes are buffered so a UTF-8
// sequence cut between two network reads still decodes.
#[derive(Default)]
struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }
}

#[derive(Deserialize)]
struct ErrorLine {
    error: String,
}

fn parse_chat_line(line: &str) -> Result<ChatChunk, ProviderError> {
    match serde_json::from_str::<ChatStreamLine>(line) {
        Ok(parsed) => Ok(ChatChunk {
            model: parsed.model,
            created_at: parsed.created_at,
            content: parsed.message.map(|m| m.content).unwrap_or_default(),
            done: parsed.done,
            done_reason: parsed.done_reason,
        }),
        Err(e) => match serde_json::from_str::<ErrorLine>(line) {
            Ok(err) => Err(ProviderError::Decode(format!("backend error: {}", err.error))),
            Err(_) => Err(ProviderError::Decode(e.to_string())),
        },
    }
}
