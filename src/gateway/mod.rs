//! HTTP gateway: routing table and server bootstrap.

pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;

pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/payments", post(handlers::submit_payment))
        .route("/payments-summary", get(handlers::payments_summary))
        .route("/health", get(handlers::health))
        .route("/purge-payments", post(handlers::purge_payments))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;
    info!("gateway listening on http://{}", addr);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
