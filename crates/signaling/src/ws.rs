//! WebSocket-Endpunkt – Upgrade, Client-Limit, Verbindungs-Tasks
//!
//! Der Router stellt `/ws` bereit. Jede angenommene Verbindung laeuft als
//! eigener Task mit einer `ClientConnection`; ueber `max_clients` hinaus
//! wird das Upgrade mit `503 Service Unavailable` abgelehnt.

use axum::{
    extract::{ws::WebSocketUpgrade, ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::connection::ClientConnection;
use crate::error::SignalingError;
use crate::event_loop::CoreHandle;
use crate::server_state::SignalingConfig;

/// Gemeinsamer Zustand des WebSocket-Endpunkts
#[derive(Clone)]
pub struct WsState {
    core: CoreHandle,
    config: Arc<SignalingConfig>,
    verbindungen: Arc<AtomicUsize>,
    shutdown_rx: watch::Receiver<bool>,
}

impl WsState {
    /// Erstellt den Endpunkt-Zustand
    pub fn neu(
        core: CoreHandle,
        config: Arc<SignalingConfig>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            core,
            config,
            verbindungen: Arc::new(AtomicUsize::new(0)),
            shutdown_rx,
        }
    }
}

/// Erstellt den Router mit dem `/ws`-Endpunkt
pub fn signaling_router(state: WsState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    State(state): State<WsState>,
) -> Response {
    let peer_addr = connect_info.map(|ConnectInfo(addr)| addr);

    let Some(platz) = VerbindungsPlatz::belegen(&state.verbindungen, state.config.max_clients) else {
        tracing::warn!(
            peer = ?peer_addr,
            max = state.config.max_clients,
            "Server voll – Verbindung abgelehnt"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, SignalingError::ServerVoll.to_string()).into_response();
    };

    let verbindung = ClientConnection::neu(state.core.clone(), Arc::clone(&state.config), peer_addr);
    let shutdown_rx = state.shutdown_rx.clone();

    ws.max_message_size(state.config.max_nachricht_bytes)
        .on_upgrade(move |socket| async move {
            let _platz = platz;
            verbindung.verarbeiten(socket, shutdown_rx).await;
        })
}

// ---------------------------------------------------------------------------
// Verbindungszaehler
// ---------------------------------------------------------------------------

/// Belegter Verbindungsplatz; wird beim Drop freigegeben
struct VerbindungsPlatz {
    zaehler: Arc<AtomicUsize>,
}

impl VerbindungsPlatz {
    fn belegen(zaehler: &Arc<AtomicUsize>, maximum: u32) -> Option<Self> {
        zaehler
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < maximum as usize).then_some(n + 1)
            })
            .ok()?;
        Some(Self {
            zaehler: Arc::clone(zaehler),
        })
    }
}

impl Drop for VerbindungsPlatz {
    fn drop(&mut self) {
        self.zaehler.fetch_sub(1, Ordering::AcqRel);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
