//! Zustand des Signaling-Kerns
//!
//! Registry und Session-Tabelle sind der einzige veraenderliche Zustand.
//! Beide gehoeren exklusiv der Event-Loop (`SignalingCore`) und werden nie
//! zwischen Tasks geteilt; alle Handler bekommen `&mut SignalingState`.

use parley_core::event::{EventBus, ParleyEvent};
use parley_core::SessionId;
use parley_protocol::wire::DEFAULT_MAX_NACHRICHT_BYTES;
use std::sync::Arc;
use std::time::Duration;

use crate::handle::SEND_QUEUE_GROESSE;
use crate::registry::PeerRegistry;
use crate::session::CallSessionManager;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige WebSocket-Verbindungen
    pub max_clients: u32,
    /// Groesse der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Maximale Groesse einer WebSocket-Nachricht in Bytes
    pub max_nachricht_bytes: usize,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// Klingel-Timeout in Sekunden (None = klingelt unbegrenzt)
    pub klingel_timeout_sek: Option<u64>,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_clients: 512,
            send_queue_groesse: SEND_QUEUE_GROESSE,
            max_nachricht_bytes: DEFAULT_MAX_NACHRICHT_BYTES,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            klingel_timeout_sek: None,
        }
    }
}

impl SignalingConfig {
    /// Klingel-Timeout als Duration
    pub fn klingel_timeout(&self) -> Option<Duration> {
        self.klingel_timeout_sek
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}

/// Plant das Klingel-Timeout einer Session
///
/// Die Implementierung muss das Timeout als eigenes Ereignis zurueck in die
/// Event-Loop liefern; `planen` selbst darf nicht blockieren.
pub trait KlingelTimer: Send {
    fn planen(&self, session_id: SessionId, nach: Duration);
}

/// Zustand des Signaling-Kerns
pub struct SignalingState {
    /// Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Presence (Wer ist unter welcher Kennung erreichbar)
    pub registry: PeerRegistry,
    /// Anruf-Sessions
    pub sessions: CallSessionManager,
    /// Optionaler Event-Bus (Metriken)
    events: Option<Arc<dyn EventBus>>,
    /// Optionaler Klingel-Timer
    klingel_timer: Option<Box<dyn KlingelTimer>>,
}

impl SignalingState {
    /// Erstellt einen leeren Zustand
    pub fn neu(config: SignalingConfig) -> Self {
        Self {
            config: Arc::new(config),
            registry: PeerRegistry::neu(),
            sessions: CallSessionManager::neu(),
            events: None,
            klingel_timer: None,
        }
    }

    /// Haengt einen Event-Bus an
    pub fn mit_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Setzt den Klingel-Timer
    pub fn mit_klingel_timer(mut self, timer: Box<dyn KlingelTimer>) -> Self {
        self.klingel_timer = Some(timer);
        self
    }

    /// Sendet ein Ereignis an den Event-Bus (Fehler werden nur geloggt)
    pub fn event_senden(&self, event: ParleyEvent) {
        if let Some(bus) = &self.events {
            if let Err(e) = bus.senden(event) {
                tracing::warn!(fehler = %e, "Event-Bus: Senden fehlgeschlagen");
            }
        }
    }

    /// Plant das Klingel-Timeout falls konfiguriert
    pub fn klingel_timeout_planen(&self, session_id: SessionId) {
        let (Some(timer), Some(dauer)) = (&self.klingel_timer, self.config.klingel_timeout()) else {
            return;
        };
        timer.planen(session_id, dauer);
    }

    /// Momentaufnahme fuer Metriken
    pub fn zustand_melden(&self) {
        self.event_senden(ParleyEvent::ZustandAktualisiert {
            verbindungen: self.registry.verbindungs_anzahl(),
            online_peers: self.registry.online_anzahl(),
            aktive_anrufe: self.sessions.anzahl(),
        });
    }

    /// Prueft die Presence-Invariante: jede Session verweist nur auf Online-Peers
    pub fn invarianten_pruefen(&self) -> Result<(), String> {
        self.sessions.invarianten_pruefen()?;
        for session in self.sessions.alle() {
            for peer in [&session.initiator, &session.responder] {
                if !self.registry.ist_online(peer) {
                    return Err(format!("{} verweist auf Offline-Peer {peer}", session.id));
                }
            }
        }
        Ok(())
    }
}
