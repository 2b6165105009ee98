//! Connection-Handles – Sendeschnittstelle zu einer Live-Verbindung
//!
//! Der Signaling-Kern besitzt keine Transport-Verbindungen. Er kennt nur
//! Handles, ueber die er Nachrichten nicht-blockierend einreihen kann.

use parley_core::ConnectionId;
use parley_protocol::ServerMessage;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Groesse der Send-Queue pro Client
pub const SEND_QUEUE_GROESSE: usize = 64;

/// Sendeschnittstelle zu einer Transport-Verbindung
///
/// `senden` darf nie blockieren oder awaiten: der Aufrufer haelt den
/// Signaling-Zustand waehrend des Aufrufs.
pub trait ConnectionHandle: Send + Sync {
    /// ID der Verbindung
    fn id(&self) -> ConnectionId;

    /// Reiht eine Nachricht ein; `false` wenn die Queue voll oder geschlossen ist
    fn senden(&self, nachricht: ServerMessage) -> bool;
}

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer WebSocket-Verbindung
///
/// Laeuft die Queue ueber, wird `ueberlauf` signalisiert und die
/// `ClientConnection` trennt den Client. Ein zu langsamer Leser verliert
/// so keine Anruf-Ereignisse unbemerkt, sondern wird wie ein getrennter
/// Peer abgebaut.
#[derive(Clone, Debug)]
pub struct ClientSender {
    id: ConnectionId,
    tx: mpsc::Sender<ServerMessage>,
    ueberlauf: Arc<Notify>,
}

impl ClientSender {
    /// Erstellt ein Handle und die zugehoerige Empfangs-Queue
    ///
    /// Die `ClientConnection` liest aus der Queue und schreibt in den Socket.
    pub fn neu(id: ConnectionId, queue_groesse: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(queue_groesse.max(1));
        let sender = Self {
            id,
            tx,
            ueberlauf: Arc::new(Notify::new()),
        };
        (sender, rx)
    }

    /// Signal, das bei voller Send-Queue ausgeloest wird
    pub fn ueberlauf_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.ueberlauf)
    }
}

impl ConnectionHandle for ClientSender {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn senden(&self, nachricht: ServerMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(verworfen)) => {
                tracing::warn!(
                    verbindung = %self.id,
                    event = verworfen.event_name(),
                    "Send-Queue voll – Verbindung wird getrennt"
                );
                self.ueberlauf.notify_one();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(verbindung = %self.id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
