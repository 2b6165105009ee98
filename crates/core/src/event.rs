//! Event-Bus Trait-Definitionen
//!
//! Der Signaling-Kern meldet Zustandsaenderungen (Presence, Anrufe) ueber
//! diese Schnittstelle. Die Metriken im Observability-Crate sind die
//! produktive Implementierung.

use crate::types::{PeerId, SessionId};
use serde::{Deserialize, Serialize};

/// Ergebnis einer Anruf-Anfrage bzw. Grund fuer das Ende einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// Angerufener hat angenommen
    Verbunden,
    /// Ziel war bereits in einer Session
    Besetzt,
    /// Ziel war nicht registriert
    NichtOnline,
    /// Anrufer war selbst schon in einer Session oder rief sich selbst an
    Abgewiesen,
    /// Angerufener hat abgelehnt
    Abgelehnt,
    /// Eine Seite hat aufgelegt
    Beendet,
    /// Eine Seite hat die Verbindung verloren
    Getrennt,
    /// Niemand hat innerhalb des Klingel-Timeouts angenommen
    Zeitueberschreitung,
}

impl CallOutcome {
    /// Label fuer Metriken
    pub fn label(&self) -> &'static str {
        match self {
            Self::Verbunden => "connected",
            Self::Besetzt => "busy",
            Self::NichtOnline => "not_online",
            Self::Abgewiesen => "refused",
            Self::Abgelehnt => "rejected",
            Self::Beendet => "ended",
            Self::Getrennt => "disconnected",
            Self::Zeitueberschreitung => "timeout",
        }
    }
}

/// Alle systemweiten Ereignisse die ueber den Event-Bus fliessen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParleyEvent {
    /// Eine Client-Nachricht wurde verarbeitet
    NachrichtVerarbeitet { event: String },
    /// Eine neue Session klingelt
    AnrufGestartet {
        session_id: SessionId,
        initiator: PeerId,
        responder: PeerId,
    },
    /// Eine Anruf-Anfrage wurde ohne Session beantwortet
    AnrufAbgewiesen { outcome: CallOutcome },
    /// Eine Session wurde angenommen
    AnrufVerbunden { session_id: SessionId },
    /// Eine Session wurde abgebaut
    AnrufBeendet {
        session_id: SessionId,
        outcome: CallOutcome,
    },
    /// Momentaufnahme nach jedem verarbeiteten Ereignis
    ZustandAktualisiert {
        verbindungen: usize,
        online_peers: usize,
        aktive_anrufe: usize,
    },
}

/// Trait fuer den Event-Bus
///
/// `senden` darf nicht blockieren; der Aufrufer haelt dabei den
/// Signaling-Zustand.
pub trait EventBus: Send + Sync + 'static {
    /// Sendet ein Ereignis an alle Abonnenten
    fn senden(&self, event: ParleyEvent) -> crate::Result<()>;
}
