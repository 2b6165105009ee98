//! Peer-Registry – Verwaltet Live-Verbindungen und Online-Status
//!
//! Haelt drei Zuordnungen konsistent:
//! - alle Live-Verbindungen (`ConnectionId -> Handle`), registriert oder nicht
//! - `PeerId -> ConnectionId` (wer ist unter welcher Kennung erreichbar)
//! - `ConnectionId -> PeerId` (Rueckrichtung fuer das Aufraeumen beim Trennen)
//!
//! Die Registry gehoert exklusiv der Signaling-Event-Loop und wird nur ueber
//! `&mut self` veraendert. Presence-Broadcasts (`users-online`) gehen an alle
//! Live-Verbindungen.

use parley_core::{ConnectionId, PeerId};
use parley_protocol::ServerMessage;
use std::collections::HashMap;
use std::sync::Arc;

use crate::handle::ConnectionHandle;

// ---------------------------------------------------------------------------
// Registrierung
// ---------------------------------------------------------------------------

/// Ergebnis einer Registrierung
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registrierung {
    /// Die Kennung war bereits auf einer anderen Verbindung registriert
    pub uebernommen_von: Option<ConnectionId>,
    /// Die Verbindung war bisher unter einer anderen Kennung registriert;
    /// diese Kennung ist jetzt offline
    pub abgeloeste_kennung: Option<PeerId>,
}

// ---------------------------------------------------------------------------
// PeerRegistry
// ---------------------------------------------------------------------------

/// Verwaltet den Online-Status aller verbundenen Peers
#[derive(Default)]
pub struct PeerRegistry {
    /// Alle Live-Verbindungen
    verbindungen: HashMap<ConnectionId, Arc<dyn ConnectionHandle>>,
    /// Kennung -> aktuelle Verbindung
    peers: HashMap<PeerId, ConnectionId>,
    /// Verbindung -> Kennung
    kennungen: HashMap<ConnectionId, PeerId>,
}

impl PeerRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Nimmt eine neue Live-Verbindung auf (noch ohne Kennung)
    pub fn verbinden(&mut self, handle: Arc<dyn ConnectionHandle>) {
        let id = handle.id();
        self.verbindungen.insert(id, handle);
        tracing::debug!(verbindung = %id, "Verbindung aufgenommen");
    }

    /// Registriert `peer_id` auf der Verbindung `verbindung`
    ///
    /// Letzte Registrierung gewinnt: war die Kennung auf einer anderen
    /// Verbindung registriert, verliert diese ihre Rueckzuordnung. Gibt
    /// `None` zurueck wenn die Verbindung unbekannt ist.
    pub fn registrieren(
        &mut self,
        peer_id: PeerId,
        verbindung: ConnectionId,
    ) -> Option<Registrierung> {
        if !self.verbindungen.contains_key(&verbindung) {
            tracing::warn!(verbindung = %verbindung, peer_id = %peer_id, "Registrierung fuer unbekannte Verbindung");
            return None;
        }

        let mut ergebnis = Registrierung::default();

        // Alte Kennung dieser Verbindung abloesen
        if let Some(alte) = self.kennungen.get(&verbindung) {
            if *alte == peer_id {
                return Some(ergebnis);
            }
            let alte = alte.clone();
            self.peers.remove(&alte);
            self.kennungen.remove(&verbindung);
            tracing::info!(verbindung = %verbindung, alt = %alte, neu = %peer_id, "Verbindung wechselt Kennung");
            ergebnis.abgeloeste_kennung = Some(alte);
        }

        // Uebernahme: Rueckzuordnung der alten Verbindung entfernen
        if let Some(alte_verbindung) = self.peers.insert(peer_id.clone(), verbindung) {
            self.kennungen.remove(&alte_verbindung);
            tracing::info!(
                peer_id = %peer_id,
                alt = %alte_verbindung,
                neu = %verbindung,
                "Kennung von neuer Verbindung uebernommen"
            );
            ergebnis.uebernommen_von = Some(alte_verbindung);
        }

        self.kennungen.insert(verbindung, peer_id.clone());
        tracing::info!(peer_id = %peer_id, verbindung = %verbindung, "Peer online");
        Some(ergebnis)
    }

    /// Entfernt eine Verbindung (Transport getrennt)
    ///
    /// Gibt die Kennung zurueck, die dadurch offline geht.
    pub fn entfernen(&mut self, verbindung: &ConnectionId) -> Option<PeerId> {
        self.verbindungen.remove(verbindung);
        let peer_id = self.kennungen.remove(verbindung)?;

        if self.peers.get(&peer_id) == Some(verbindung) {
            self.peers.remove(&peer_id);
        }

        tracing::info!(peer_id = %peer_id, verbindung = %verbindung, "Peer offline");
        Some(peer_id)
    }

    /// Gibt das Handle einer Kennung zurueck
    pub fn nachschlagen(&self, peer_id: &PeerId) -> Option<&dyn ConnectionHandle> {
        let verbindung = self.peers.get(peer_id)?;
        self.verbindungen.get(verbindung).map(|h| h.as_ref())
    }

    /// Gibt das Handle einer Verbindung zurueck (registriert oder nicht)
    pub fn verbindung(&self, verbindung: &ConnectionId) -> Option<&dyn ConnectionHandle> {
        self.verbindungen.get(verbindung).map(|h| h.as_ref())
    }

    /// Gibt die Kennung einer Verbindung zurueck
    pub fn kennung_von(&self, verbindung: &ConnectionId) -> Option<&PeerId> {
        self.kennungen.get(verbindung)
    }

    /// Prueft ob eine Kennung online ist
    pub fn ist_online(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    /// Alle online Kennungen, sortiert
    pub fn online_peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.peers.keys().cloned().collect();
        peers.sort();
        peers
    }

    /// Anzahl der online Kennungen
    pub fn online_anzahl(&self) -> usize {
        self.peers.len()
    }

    /// Anzahl der Live-Verbindungen
    pub fn verbindungs_anzahl(&self) -> usize {
        self.verbindungen.len()
    }

    /// Sendet eine Nachricht an alle Live-Verbindungen
    ///
    /// Gibt die Anzahl der erfolgreichen Sendungen zurueck.
    pub fn an_alle_senden(&self, nachricht: &ServerMessage) -> usize {
        self.verbindungen
            .values()
            .filter(|h| h.senden(nachricht.clone()))
            .count()
    }

    /// Sendet die aktuelle Presence-Liste an alle Live-Verbindungen
    pub fn presence_senden(&self) -> usize {
        let nachricht = ServerMessage::users_online(self.online_peers());
        let gesendet = self.an_alle_senden(&nachricht);
        tracing::debug!(online = self.online_anzahl(), gesendet, "Presence gesendet");
        gesendet
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
