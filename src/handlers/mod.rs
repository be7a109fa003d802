mod generate;
mod health;
mod metrics;

use axum::{Router, routing::get};

use crate::state::AppState;

pub use generate::{generate_handler, message_handler, stream_handler};
pub use health::health_handler;
pub use metrics::metrics_handler;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/ai/generate", get(generate_handler))
        .route("/ai/message", get(message_handler))
        .route("/ai/generateStream", get(stream_handler))
        .with_state(state)
}
