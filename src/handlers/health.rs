use axum::{Json, extract::State, response::IntoResponse};

use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "storageRoot": state.store.root().display().to_string(),
    }))
}
