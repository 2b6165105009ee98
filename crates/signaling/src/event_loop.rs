//! Signaling-Kern – Single-Owner Event-Loop
//!
//! Alle Zustandsaenderungen laufen ueber eine einzige Queue. Der Kern-Task
//! besitzt den `MessageDispatcher` (und damit Registry und Sessions) und
//! verarbeitet ein Ereignis nach dem anderen vollstaendig. Verbindungs-Tasks
//! sprechen nur ueber ein `CoreHandle` mit ihm.
//!
//! ```text
//! ClientConnection --CoreHandle--> [mpsc] --> SignalingCore --> ClientSender --> ClientConnection
//!                                    ^
//!                 TokioKlingelTimer -+
//! ```

use parley_core::{ConnectionId, SessionId};
use parley_protocol::ClientMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dispatcher::MessageDispatcher;
use crate::error::{SignalingError, SignalingResult};
use crate::handle::ConnectionHandle;
use crate::server_state::{KlingelTimer, SignalingState};

/// Groesse der Kern-Queue
pub const KERN_QUEUE_GROESSE: usize = 1024;

/// Ereignis fuer den Signaling-Kern
pub enum CoreEvent {
    /// Neue Transport-Verbindung
    Verbunden(Arc<dyn ConnectionHandle>),
    /// Dekodierte Client-Nachricht
    Nachricht {
        verbindung: ConnectionId,
        nachricht: ClientMessage,
    },
    /// Transport-Verbindung getrennt
    Getrennt(ConnectionId),
    /// Klingel-Timeout einer Session abgelaufen
    KlingelTimeout(SessionId),
}

impl CoreEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Verbunden(_) => "verbunden",
            Self::Nachricht { nachricht, .. } => nachricht.event_name(),
            Self::Getrennt(_) => "getrennt",
            Self::KlingelTimeout(_) => "klingel-timeout",
        }
    }
}

// ---------------------------------------------------------------------------
// CoreHandle
// ---------------------------------------------------------------------------

/// Sendeseite der Kern-Queue
///
/// Der Kern laeuft solange mindestens ein `CoreHandle` existiert.
#[derive(Clone)]
pub struct CoreHandle {
    tx: mpsc::Sender<CoreEvent>,
}

impl CoreHandle {
    /// Meldet eine neue Verbindung
    pub async fn verbunden(&self, handle: Arc<dyn ConnectionHandle>) -> SignalingResult<()> {
        self.senden(CoreEvent::Verbunden(handle)).await
    }

    /// Reicht eine Client-Nachricht ein
    pub async fn nachricht(
        &self,
        verbindung: ConnectionId,
        nachricht: ClientMessage,
    ) -> SignalingResult<()> {
        self.senden(CoreEvent::Nachricht {
            verbindung,
            nachricht,
        })
        .await
    }

    /// Meldet eine getrennte Verbindung
    pub async fn getrennt(&self, verbindung: ConnectionId) -> SignalingResult<()> {
        self.senden(CoreEvent::Getrennt(verbindung)).await
    }

    async fn senden(&self, event: CoreEvent) -> SignalingResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| SignalingError::KernBeendet)
    }
}

// ---------------------------------------------------------------------------
// Klingel-Timer
// ---------------------------------------------------------------------------

/// Liefert Klingel-Timeouts als `CoreEvent` zurueck in die Queue
///
/// Haelt nur einen schwachen Sender, damit geplante Timeouts den Kern nicht
/// am Leben halten.
struct TokioKlingelTimer {
    tx: mpsc::WeakSender<CoreEvent>,
}

impl KlingelTimer for TokioKlingelTimer {
    fn planen(&self, session_id: SessionId, nach: Duration) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(nach).await;
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(CoreEvent::KlingelTimeout(session_id)).await;
            }
        });
    }
}

// ---------------------------------------------------------------------------
// SignalingCore
// ---------------------------------------------------------------------------

/// Event-Loop des Signaling-Kerns
pub struct SignalingCore {
    dispatcher: MessageDispatcher,
    rx: mpsc::Receiver<CoreEvent>,
}

impl SignalingCore {
    /// Startet den Kern als eigenen tokio-Task
    ///
    /// Ist ein Klingel-Timeout konfiguriert, wird ein tokio-basierter Timer
    /// eingehaengt. Der Task endet, sobald alle `CoreHandle`s gedroppt sind.
    pub fn starten(state: SignalingState) -> (CoreHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(KERN_QUEUE_GROESSE);

        let state = if state.config.klingel_timeout().is_some() {
            state.mit_klingel_timer(Box::new(TokioKlingelTimer { tx: tx.downgrade() }))
        } else {
            state
        };

        let kern = Self {
            dispatcher: MessageDispatcher::neu(state),
            rx,
        };
        let task = tokio::spawn(kern.laufen());

        (CoreHandle { tx }, task)
    }

    async fn laufen(mut self) {
        tracing::info!("Signaling-Kern gestartet");

        while let Some(event) = self.rx.recv().await {
            self.verarbeiten(event);
        }

        tracing::info!(
            verbindungen = self.dispatcher.state().registry.verbindungs_anzahl(),
            "Signaling-Kern beendet"
        );
    }

    fn verarbeiten(&mut self, event: CoreEvent) {
        let name = event.name();
        let span = tracing::trace_span!("kern_event", event = name);
        let _guard = span.enter();

        match event {
            CoreEvent::Verbunden(handle) => self.dispatcher.verbindung_oeffnen(handle),
            CoreEvent::Nachricht {
                verbindung,
                nachricht,
            } => self.dispatcher.dispatch(verbindung, nachricht),
            CoreEvent::Getrennt(verbindung) => self.dispatcher.verbindung_schliessen(verbindung),
            CoreEvent::KlingelTimeout(session_id) => self.dispatcher.klingel_timeout(session_id),
        }

        if cfg!(debug_assertions) {
            if let Err(fehler) = self.dispatcher.state().invarianten_pruefen() {
                tracing::error!(%fehler, "Invariante verletzt");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
