//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede WebSocket-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Der Task dekodiert eingehende Frames, reicht sie an den
//! Signaling-Kern weiter und schreibt die Send-Queue in den Socket.
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen WebSocket-Ping
//! - Kommt innerhalb von `verbindungs_timeout_sek` kein Frame, wird die
//!   Verbindung getrennt
//!
//! ## Ueberlauf
//! Laeuft die Send-Queue voll, wird die Verbindung mit `1013` (try again
//! later) geschlossen. Der Kern baut dann Presence und Session ab.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use parley_core::ConnectionId;
use parley_protocol::JsonCodec;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::event_loop::CoreHandle;
use crate::handle::ClientSender;
use crate::server_state::SignalingConfig;

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    core: CoreHandle,
    config: Arc<SignalingConfig>,
    peer_addr: Option<SocketAddr>,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(core: CoreHandle, config: Arc<SignalingConfig>, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            core,
            config,
            peer_addr,
        }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, das Inaktivitaets-Timeout greift oder
    /// ein Shutdown-Signal eingeht. Danach wird der Kern informiert.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let verbindung = ConnectionId::new();
        let peer = self
            .peer_addr
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unbekannt".to_string());
        let keepalive_intervall = Duration::from_secs(self.config.keepalive_sek.max(1));
        let timeout_dauer = Duration::from_secs(self.config.verbindungs_timeout_sek);
        let codec = JsonCodec::with_max_size(self.config.max_nachricht_bytes);

        tracing::info!(peer = %peer, verbindung = %verbindung, "Neue WebSocket-Verbindung");

        let (sender, mut sende_rx) = ClientSender::neu(verbindung, self.config.send_queue_groesse);
        let ueberlauf = sender.ueberlauf_signal();
        if self.core.verbunden(Arc::new(sender)).await.is_err() {
            tracing::warn!(peer = %peer, "Signaling-Kern nicht erreichbar – Verbindung verworfen");
            return;
        }

        let (mut ws_tx, mut ws_rx) = socket.split();

        // Zeitpunkt des letzten empfangenen Frames
        let mut letzter_empfang = Instant::now();
        let mut keepalive =
            tokio::time::interval_at(Instant::now() + keepalive_intervall, keepalive_intervall);

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            letzter_empfang = Instant::now();
                            match codec.decode(&text) {
                                Ok(nachricht) => {
                                    if self.core.nachricht(verbindung, nachricht).await.is_err() {
                                        tracing::warn!(peer = %peer, "Signaling-Kern beendet");
                                        break;
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        peer = %peer,
                                        verbindung = %verbindung,
                                        fehler = %e,
                                        "Ungueltige Nachricht ignoriert"
                                    );
                                }
                            }
                        }
                        Some(Ok(Message::Binary(daten))) => {
                            letzter_empfang = Instant::now();
                            tracing::debug!(peer = %peer, bytes = daten.len(), "Binaer-Frame ignoriert");
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                            letzter_empfang = Instant::now();
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(peer = %peer, "Verbindung vom Client getrennt");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer, fehler = %e, "WebSocket-Lesefehler");
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht aus dem Kern
                Some(ausgehend) = sende_rx.recv() => {
                    let text = match codec.encode(&ausgehend) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(fehler = %e, "Nachricht konnte nicht kodiert werden");
                            continue;
                        }
                    };
                    if let Err(e) = ws_tx.send(Message::Text(text)).await {
                        tracing::warn!(peer = %peer, fehler = %e, "Senden fehlgeschlagen");
                        break;
                    }
                }

                // Send-Queue uebergelaufen
                _ = ueberlauf.notified() => {
                    tracing::warn!(peer = %peer, verbindung = %verbindung, "Client liest zu langsam – Verbindung wird getrennt");
                    let abschied = Message::Close(Some(CloseFrame {
                        code: close_code::AGAIN,
                        reason: "Send-Queue uebergelaufen".into(),
                    }));
                    let _ = ws_tx.send(abschied).await;
                    break;
                }

                // Keepalive-Ping und Inaktivitaets-Timeout
                _ = keepalive.tick() => {
                    if letzter_empfang.elapsed() > timeout_dauer {
                        tracing::warn!(peer = %peer, "Verbindungs-Timeout");
                        break;
                    }
                    if let Err(e) = ws_tx.send(Message::Ping(Vec::new())).await {
                        tracing::warn!(peer = %peer, fehler = %e, "Ping-Senden fehlgeschlagen");
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer, "Shutdown-Signal – Verbindung wird getrennt");
                        let abschied = Message::Close(Some(CloseFrame {
                            code: close_code::AWAY,
                            reason: "Server wird heruntergefahren".into(),
                        }));
                        let _ = ws_tx.send(abschied).await;
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        if self.core.getrennt(verbindung).await.is_err() {
            tracing::debug!(verbindung = %verbindung, "Kern bereits beendet");
        }

        tracing::info!(peer = %peer, verbindung = %verbindung, "Verbindungs-Task beendet");
    }
}
