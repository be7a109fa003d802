mod config;
mod error;
mod handlers;
mod load_balancer;
mod metrics;
mod models;
mod provider;
mod sanitizer;
mod state;
mod storage;

use anyhow::Context;
use clap::Parser; // for cli
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Args;
use crate::load_balancer::{LoadBalancer, health_checker};
use crate::provider::OllamaProvider;
use crate::state::AppState;
use crate::storage::ContentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn"));
    fmt().with_env_filter(filter).compact().init();

    // parse cli arguments
    let args = Args::parse();

    // no storage root, no service
    let storage_root = args.storage_root();
    let store = ContentStore::open(&storage_root)
        .with_context(|| format!("failed to create base directory {}", storage_root.display()))?;

    let load_balancer = Arc::new(LoadBalancer::new(&args.backends)?);
    let client = reqwest::Client::new();

    // background health checks
    let checker_lb = Arc::clone(&load_balancer);
    let checker_client = client.clone();
    let check_interval = Duration::from_secs(args.health_interval);
    tokio::spawn(async move {
        health_checker(checker_lb, checker_client, check_interval).await;
    });

    let provider = OllamaProvider::new(client, load_balancer, args.model.clone());
    let state = AppState::new(Arc::new(provider), store);

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("archivist running on http://localhost:{}", args.port);
    tracing::info!("model: {}", args.model);
    tracing::info!("saving responses under {}", storage_root.display());

    axum::serve(listener, app).await?;
    Ok(())
}
