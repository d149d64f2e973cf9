//! The served HTTP surface: peer sync, a human-readable chain view and a
//! remote shutdown hook.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::info;

use crate::blockchain::{Block, Chain};
use crate::error::Result;

#[derive(Clone)]
pub struct AppState {
    chain: Arc<Mutex<Chain>>,
    shutdown: mpsc::Sender<()>,
}

/// Builds the node's router. Exposed separately so tests can serve a chain
/// without the full binary wiring.
pub fn router(chain: Arc<Mutex<Chain>>, shutdown: mpsc::Sender<()>) -> Router {
    Router::new()
        .route("/", get(chain_page))
        .route("/blockchain", get(chain_export))
        .route("/apagado", get(shutdown_node))
        .with_state(AppState { chain, shutdown })
}

/// Serves the node's endpoints until a shutdown request arrives.
pub async fn serve(chain: Arc<Mutex<Chain>>, addr: SocketAddr) -> Result<()> {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    let app = router(chain, shutdown_tx);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// `GET /blockchain`: the chain as a JSON array of block records. The lock
/// is held just long enough to clone a consistent snapshot.
async fn chain_export(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.chain.lock().blocks.clone())
}

/// `GET /`: a minimal page embedding the same snapshot for a browser.
async fn chain_page(State(state): State<AppState>) -> Html<String> {
    let blocks = state.chain.lock().blocks.clone();
    let encoded = serde_json::to_string(&blocks).unwrap_or_else(|_| "[]".to_string());
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>aula-chain</title></head>\n\
         <body>\n<h1>Blockchain</h1>\n<pre id=\"blockchain\">{encoded}</pre>\n</body>\n</html>\n"
    ))
}

/// `GET /apagado`: acknowledge, then shut the server down gracefully.
async fn shutdown_node(State(state): State<AppState>) -> &'static str {
    let _ = state.shutdown.try_send(());
    "Server shutting down..."
}
