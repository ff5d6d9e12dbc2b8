//! axum web server for the status dashboard.
//!
//! JSON snapshots at `/api/metrics` and `/api/claims`; `/ws` pushes both
//! to connected browsers as they change.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;

use super::metrics::MetricsSnapshot;
use super::{ClaimsSnapshot, DashboardState};

pub fn router(state: Arc<DashboardState>) -> Router {
    Router::new()
        .route("/api/metrics", get(metrics))
        .route("/api/claims", get(claims))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

/// Start the dashboard web server. Runs until the listener fails.
pub async fn start(state: Arc<DashboardState>, port: u16) {
    let addr = format!("0.0.0.0:{}", port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Dashboard failed to bind to {}: {}", addr, e);
            return;
        }
    };
    tracing::info!("Dashboard listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, router(state)).await {
        tracing::error!("Dashboard server error: {}", e);
    }
}

async fn metrics(State(state): State<Arc<DashboardState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn claims(State(state): State<Arc<DashboardState>>) -> Json<ClaimsSnapshot> {
    Json(state.claims())
}

/// Upgrade an HTTP request to a WebSocket connection.
async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<DashboardState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Push metrics and claim lists to a connected browser.
async fn handle_socket(mut socket: WebSocket, state: Arc<DashboardState>) {
    let mut claims_rx = state.subscribe_claims();
    let mut ticker = tokio::time::interval(Duration::from_millis(200));

    // The current claim list goes out first, before any change arrives.
    let current = claims_rx.borrow_and_update().clone();
    let initial = serde_json::json!({
        "type": "claims",
        "data": current,
    });
    if send_json(&mut socket, &initial).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let msg = serde_json::json!({
                    "type": "metrics",
                    "data": state.metrics.snapshot(),
                });
                if send_json(&mut socket, &msg).await.is_err() {
                    break;
                }
            }

            result = claims_rx.changed() => {
                if result.is_err() {
                    break; // sender dropped
                }
                let claims = claims_rx.borrow_and_update().clone();
                let msg = serde_json::json!({
                    "type": "claims",
                    "data": claims,
                });
                if send_json(&mut socket, &msg).await.is_err() {
                    break;
                }
            }

            // Drain any incoming messages (ping/pong, close).
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }
}

async fn send_json(socket: &mut WebSocket, value: &serde_json::Value) -> Result<(), ()> {
    let text = value.to_string();
    socket.send(Message::Text(text)).await.map_err(|_| ())
}
