//! ==============================================================================
//! live.rs - Realtime Viewer Broadcast
//! ==============================================================================
//!
//! purpose:
//!     pushes the current observation + mood to every connected WebSocket
//!     viewer, every tick, unconditionally. delivery is at-most-effort:
//!     no acks, no retry, no backpressure; freshness beats bandwidth.
//!
//! connection model:
//!     viewers connect at /ws and get a numeric handle from an atomic
//!     counter. connect/disconnect produce a log line and nothing else.
//!     slow or dead receivers are pruned by the broadcast channel / the
//!     socket, not by this component. inbound viewer messages are drained
//!     and ignored (nothing consumes them yet).
//!
//! relationships:
//!     - used by: sched.rs (broadcast each tick), main.rs (router/server)
//!     - uses: tokio broadcast channel to fan out one serialized payload
//!
//! ==============================================================================

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::mood::Mood;
use crate::sensors::Observation;

static NEXT_VIEWER_ID: AtomicU64 = AtomicU64::new(1);

/// wire payload pushed to viewers every tick
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LivePayload {
    pub soil: u16,
    pub light: u16,
    /// celsius, 1 decimal place
    pub temp: f32,
    /// percent, whole number
    pub hum: f32,
    pub mood: &'static str,
}

impl LivePayload {
    pub fn new(obs: &Observation, mood: Mood) -> Self {
        Self {
            soil: obs.soil_raw,
            light: obs.light_raw,
            temp: obs.temp_wire(),
            hum: obs.hum_wire(),
            mood: mood.wire_name(),
        }
    }
}

#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<String>,
    /// latest payload, served at /api for plain-HTTP viewers
    latest: Arc<RwLock<Option<LivePayload>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        // small buffer on purpose: laggards get pruned, not queued for
        let (tx, _) = broadcast::channel(8);
        Self { tx, latest: Arc::new(RwLock::new(None)) }
    }

    /// Serialize and fan out one tick's state. Fire-and-forget: a send with
    /// no receivers is not an error.
    pub async fn broadcast(&self, obs: &Observation, mood: Mood) {
        let payload = LivePayload::new(obs, mood);
        *self.latest.write().await = Some(payload.clone());
        match serde_json::to_string(&payload) {
            Ok(json) => {
                let _ = self.tx.send(json);
            }
            Err(e) => debug!("payload serialization failed: {}", e),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

/// Build the viewer-facing router: /ws for the live feed, /api for the
/// latest snapshot.
pub fn router(broadcaster: Broadcaster) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api", get(api_handler))
        .layer(CorsLayer::permissive())
        .with_state(broadcaster)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(broadcaster): State<Broadcaster>,
) -> impl IntoResponse {
    let id = NEXT_VIEWER_ID.fetch_add(1, Ordering::Relaxed);
    info!("[{}] viewer connected", id);
    let rx = broadcaster.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx, id))
}

async fn handle_socket(mut socket: WebSocket, mut rx: broadcast::Receiver<String>, id: u64) {
    loop {
        tokio::select! {
            update = rx.recv() => {
                match update {
                    Ok(json) => {
                        if socket.send(WsMessage::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!("[{}] viewer lagged, skipped {} updates", id, n);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    // viewers have nothing to say yet; drain and ignore
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
    info!("[{}] viewer disconnected", id);
}

/// latest payload as plain JSON (null until the first tick)
async fn api_handler(State(broadcaster): State<Broadcaster>) -> Json<Option<LivePayload>> {
    Json(broadcaster.latest.read().await.clone())
}
