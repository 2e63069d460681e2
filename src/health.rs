//! Liveness and readiness probes.

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::info;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn ready() -> Json<Value> {
    Json(json!({ "status": "ready" }))
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind health listener on {addr}"))
}

pub async fn serve(listener: TcpListener) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "health listener started");
    }
    axum::serve(listener, router())
        .await
        .context("health listener stopped")
}
