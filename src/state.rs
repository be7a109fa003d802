use std::sync::Arc;

use crate::provider::CompletionProvider;
use crate::storage::ContentStore;

// app's shared state, built once in main and cloned per request

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn CompletionProvider>,
    pub store: ContentStore,
}

impl AppState {
    pub fn new(provider: Arc<dyn CompletionProvider>, store: ContentStore) -> Self {
        Self { provider, store }
    }
}
