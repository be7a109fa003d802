use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::metrics::PROVIDER_ERRORS;

// Filesystem failures while persisting a generation
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot create storage root {}: {source}", .path.display())]
    CreateRoot { path: PathBuf, source: io::Error },

    #[error("cannot create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

// Anything that goes wrong talking to the model backend
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("backend {url} returned {status}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("could not decode backend response: {0}")]
    Decode(String),
}

// Errors that escape a handler
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
        };

        PROVIDER_ERRORS.inc();
        tracing::error!("[Handler] generation failed: {}", self);

        (status, self.to_string()).into_response()
    }
}
