//! Status server: the rendering subscriber's view of the collector, as
//! plain JSON. Rendering itself lives elsewhere; this surface only hands
//! out the latest computed state and accepts manual refresh triggers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch, RwLock};
use tracing::info;

use crate::state::{DashboardState, DashboardView};

/// Shared handles the HTTP surface needs.
#[derive(Clone)]
pub struct ServerState {
    pub state: Arc<RwLock<DashboardState>>,
    pub refresh_tx: mpsc::Sender<()>,
}

/// One-shot JSON status: last good view plus refresh bookkeeping.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub view: Option<DashboardView>,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub next_due: Option<DateTime<Utc>>,
    pub polls: u64,
    pub failures: u64,
}

pub fn router(server_state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/refresh", post(refresh))
        .with_state(server_state)
}

async fn health() -> &'static str {
    "ok"
}

async fn status(State(s): State<ServerState>) -> Json<StatusResponse> {
    let state = s.state.read().await;
    Json(StatusResponse {
        view: state.last_view.clone(),
        last_error: state.last_error.clone(),
        last_success_at: state.last_success_at,
        next_due: state.next_due,
        polls: state.polls,
        failures: state.failures,
    })
}

/// Edge-triggered manual refresh: bypasses the interval gate immediately.
async fn refresh(State(s): State<ServerState>) -> impl IntoResponse {
    match s.refresh_tx.try_send(()) {
        Ok(()) => (StatusCode::ACCEPTED, "refresh scheduled"),
        Err(_) => (StatusCode::TOO_MANY_REQUESTS, "refresh already pending"),
    }
}

/// Serve until the stop signal fires.
pub async fn serve(
    bind: SocketAddr,
    server_state: ServerState,
    mut stop_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, "status server listening");
    axum::serve(listener, router(server_state))
        .with_graceful_shutdown(async move {
            let _ = stop_rx.wait_for(|stopped| *stopped).await;
        })
        .await?;
    Ok(())
}
