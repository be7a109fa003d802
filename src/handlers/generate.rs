use axum::{
    BoxError, Json,
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Instant;

use crate::error::{AppError, StorageError};
use crate::metrics::{GENERATION_LATENCY, REQUEST_TOTAL};
use crate::models::GenerationResult;
use crate::provider::Prompt;
use crate::state::AppState;

const DEFAULT_MESSAGE: &str = "Tell me a joke";

#[derive(Deserialize, Debug)]
pub struct MessageQuery {
    message: Option<String>,
}

impl MessageQuery {
    // missing and empty both fall back to the default prompt
    fn into_message(self) -> String {
        self.message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string())
    }
}

// Generation is required; saving is best effort and reported alongside it
async fn generate_and_save(
    state: &AppState,
    message: &str,
) -> Result<(String, Result<PathBuf, StorageError>), AppError> {
    let start_time = Instant::now();
    let generation = state.provider.complete(message).await?;
    GENERATION_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let saved = state.store.persist(message, &generation).await;
    Ok((generation, saved))
}

// GET /ai/generate -> {"generation", "filePath" | "error"}
pub async fn generate_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<GenerationResult>, AppError> {
    REQUEST_TOTAL.with_label_values(&["generate"]).inc();

    let message = query.into_message();
    let (generation, saved) = generate_and_save(&state, &message).await?;

    let result = match saved {
        Ok(path) => GenerationResult::saved(generation, path.display().to_string()),
        Err(e) => GenerationResult::unsaved(generation, format!("Failed to save file: {}", e)),
    };
    Ok(Json(result))
}

// GET /ai/message -> plain text with the save status appended
pub async fn message_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<String, AppError> {
    REQUEST_TOTAL.with_label_values(&["message"]).inc();

    let message = query.into_message();
    let (generation, saved) = generate_and_save(&state, &message).await?;

    let annotation = match saved {
        Ok(path) => format!("[Saved to: {}]", path.display()),
        Err(e) => format!("[Failed to save file: {}]", e),
    };
    Ok(format!("{}\n\n{}", generation, annotation))
}

// GET /ai/generateStream -> SSE, one ChatChunk per event; nothing is saved
pub async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, BoxError>>>, AppError> {
    REQUEST_TOTAL.with_label_values(&["generateStream"]).inc();

    let prompt = Prompt::user(query.into_message());
    let chunks = state.provider.stream(prompt).await?;

    let events = chunks.map(|chunk| -> Result<Event, BoxError> {
        let chunk = chunk.inspect_err(|e| tracing::warn!("[Handler] stream ended early: {}", e))?;
        Ok(Event::default().json_data(&chunk)?)
    });

    Ok(Sse::new(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::router;
    use crate::provider::ChatChunk;
    use crate::provider::fake::FakeProvider;
    use crate::storage::ContentStore;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;
    use tower::ServiceExt;

    fn create_test_app(provider: FakeProvider) -> (Router, Arc<FakeProvider>, ContentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::open(temp_dir.path().join("content")).unwrap();
        let provider = Arc::new(provider);
        let app = router(AppState::new(provider.clone(), store.clone()));
        (app, provider, store, temp_dir)
    }

    // Storage root sized so "<root>/query-pun" is a legal path but
    // "<root>/query-pun/response-xxxxxxxx.txt" is longer than PATH_MAX (4095 usable bytes)
    #[cfg(target_os = "linux")]
    fn root_near_path_max(base: &Path) -> PathBuf {
        const ROOT_LEN: usize = 4075; // dir: 4085, file: 4107
        let mut root = base.to_path_buf();
        loop {
            let remaining = ROOT_LEN - root.as_os_str().len();
            if remaining <= 250 {
                root.push("d".repeat(remaining - 1));
                return root;
            }
            root.push("d".repeat(200));
        }
    }

    fn chunk(content: &str, done: bool) -> ChatChunk {
        ChatChunk {
            model: "fake".to_string(),
            created_at: None,
            content: content.to_string(),
            done,
            done_reason: None,
        }
    }

    // next non-empty body frame, failing if nothing shows up in time
    async fn next_data(body: &mut Body) -> String {
        loop {
            let frame = timeout(Duration::from_secs(5), body.frame())
                .await
                .expect("no event within 5s")
                .expect("body ended")
                .unwrap();
            if let Ok(data) = frame.into_data() {
                if !data.is_empty() {
                    return String::from_utf8(data.to_vec()).unwrap();
                }
            }
        }
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    // replace the storage root with a plain file so every save fails
    fn break_storage(store: &ContentStore) {
        std::fs::remove_dir_all(store.root()).unwrap();
        std::fs::write(store.root(), "blocker").unwrap();
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn generate_returns_text_and_saved_path() {
        let (app, provider, store, _temp) = create_test_app(FakeProvider::text("Knock knock."));

        let (status, _, body) = send(app, "/ai/generate").await;
        assert_eq!(status, StatusCode::OK);

        let result: GenerationResult = serde_json::from_str(&body).unwrap();
        assert_eq!(result.generation, "Knock knock.");
        assert!(result.error.is_none());

        let path = PathBuf::from(result.file_path.unwrap());
        assert_eq!(path.parent().unwrap(), store.root().join("query-tell-me-a-joke"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Knock knock.");
        assert_eq!(provider.seen_prompts(), ["Tell me a joke"]);
    }

    #[tokio::test]
    async fn generate_uses_message_param() {
        let (app, provider, store, _temp) = create_test_app(FakeProvider::text("Hi!"));

        let (_, _, body) = send(app, "/ai/generate?message=Hello%2C%20World%21").await;
        let result: GenerationResult = serde_json::from_str(&body).unwrap();

        let path = PathBuf::from(result.file_path.unwrap());
        assert_eq!(path.parent().unwrap(), store.root().join("query-hello-world"));
        assert_eq!(provider.seen_prompts(), ["Hello, World!"]);
    }

    #[tokio::test]
    async fn empty_message_falls_back_to_default() {
        let (app, provider, _store, _temp) = create_test_app(FakeProvider::text("ok"));
        send(app, "/ai/generate?message=").await;
        assert_eq!(provider.seen_prompts(), ["Tell me a joke"]);
    }

    #[tokio::test]
    async fn generate_keeps_text_when_save_fails() {
        let (app, _provider, store, _temp) = create_test_app(FakeProvider::text("still here"));
        break_storage(&store);

        let (status, _, body) = send(app, "/ai/generate").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["generation"], "still here");
        assert!(json.get("filePath").is_none());
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("Failed to save file: "), "{}", error);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn generate_reports_failed_write_into_existing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContentStore::open(root_near_path_max(temp_dir.path())).unwrap();
        let app = router(AppState::new(
            Arc::new(FakeProvider::text("written nowhere")),
            store.clone(),
        ));

        let (status, _, body) = send(app, "/ai/generate?message=pun").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["generation"], "written nowhere");
        assert!(json.get("filePath").is_none());
        let error = json["error"].as_str().unwrap();
        assert!(error.starts_with("Failed to save file: cannot write "), "{}", error);

        // directory step succeeded, only the file is missing
        let dir = store.root().join("query-pun");
        assert!(dir.is_dir());
        assert_eq!(file_count(&dir), 0);
    }

    #[tokio::test]
    async fn message_appends_saved_path() {
        let (app, _provider, store, _temp) = create_test_app(FakeProvider::text("A joke."));

        let (status, content_type, body) = send(app, "/ai/message?message=pun").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/plain"));

        let (text, note) = body.split_once("\n\n").unwrap();
        assert_eq!(text, "A joke.");
        let path = note
            .strip_prefix("[Saved to: ")
            .and_then(|s| s.strip_suffix(']'))
            .unwrap();
        assert!(Path::new(path).starts_with(store.root().join("query-pun")));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "A joke.");
    }

    #[tokio::test]
    async fn message_appends_failure_note() {
        let (app, _provider, store, _temp) = create_test_app(FakeProvider::text("A joke."));
        break_storage(&store);

        let (status, _, body) = send(app, "/ai/message").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("A joke.\n\n[Failed to save file: "));
        assert!(body.ends_with(']'));
    }

    #[tokio::test]
    async fn provider_failure_is_bad_gateway() {
        let (app, _provider, store, _temp) = create_test_app(FakeProvider::failing("model crashed"));

        let (status, _, body) = send(app.clone(), "/ai/generate").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("model crashed"));

        let (status, _, _) = send(app, "/ai/message").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(file_count(store.root()), 0);
    }

    #[tokio::test]
    async fn stream_emits_chunks_in_order_without_saving() {
        let provider = FakeProvider::chunks(&["Why ", "so ", "serious", "?"]);
        let (app, provider, store, _temp) = create_test_app(provider);

        let (status, content_type, body) = send(app, "/ai/generateStream?message=joker").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/event-stream"));

        let chunks: Vec<ChatChunk> = body
            .lines()
            .filter_map(|l| l.strip_prefix("data:"))
            .map(|d| serde_json::from_str(d.trim_start()).unwrap())
            .collect();
        let texts: Vec<_> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, ["Why ", "so ", "serious", "?"]);
        assert!(chunks.last().unwrap().done);

        assert_eq!(provider.seen_prompts(), ["joker"]);
        assert_eq!(file_count(store.root()), 0);
    }

    #[tokio::test]
    async fn stream_forwards_each_chunk_as_it_arrives() {
        let (provider, tx) = FakeProvider::live();
        let (app, _provider, store, _temp) = create_test_app(provider);

        let res = app
            .oneshot(Request::builder().uri("/ai/generateStream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let mut body = res.into_body();

        // the second chunk does not exist yet when the first is read
        tx.unbounded_send(chunk("first", false)).unwrap();
        let data = next_data(&mut body).await;
        assert!(data.contains("\"first\""), "{}", data);
        assert!(!data.contains("second"));

        tx.unbounded_send(chunk("second", true)).unwrap();
        let data = next_data(&mut body).await;
        assert!(data.contains("\"second\""), "{}", data);

        drop(tx);
        let rest = body.collect().await.unwrap().to_bytes();
        assert!(rest.is_empty());
        assert_eq!(file_count(store.root()), 0);
    }

    #[tokio::test]
    async fn stream_provider_failure_is_bad_gateway() {
        let (app, _provider, _store, _temp) = create_test_app(FakeProvider::failing("offline"));
        let (status, _, _) = send(app, "/ai/generateStream").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn health_and_metrics_respond() {
        let (app, _provider, _store, _temp) = create_test_app(FakeProvider::text("x"));

        let (status, _, body) = send(app.clone(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "healthy");

        send(app.clone(), "/ai/generate").await;
        let (status, _, body) = send(app, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("archivist_requests_total"));
    }
}
