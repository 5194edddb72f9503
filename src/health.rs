//! Liveness endpoint for hosting platforms that expect an open HTTP port.

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::info;

async fn ok() -> &'static str {
    "ok"
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(ok))
        .route("/health", get(ok))
}

pub async fn serve(listener: TcpListener) -> Result<()> {
    axum::serve(listener, router())
        .await
        .context("Health server error")?;
    Ok(())
}

pub async fn run(host: &str, port: u16) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Health server listening on {}", addr);
    serve(listener).await
}
