//! Call-Session-Manager – Zwei-Parteien-Zustandsautomat
//!
//! ## State Machine (pro Peer-Paar)
//! ```text
//! IDLE --call-request--> RINGING --call-answer--> CONNECTED
//!   ^                       |                        |
//!   +---- end-call / call-reject / disconnect / timeout
//! ```
//!
//! "Besetzt" wird nie gespeichert, sondern aus der Session-Mitgliedschaft
//! abgeleitet. Der Teilnehmer-Index wird ausschliesslich zusammen mit der
//! Session geschrieben und geloescht, immer fuer beide Parteien.

use parley_core::{PeerId, SessionId};
use std::collections::HashMap;
use std::time::Instant;

use crate::error::{SignalingError, SignalingResult};

/// Zustand einer Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Angerufener wurde benachrichtigt, Antwort steht aus
    Ringing,
    /// Angerufener hat angenommen
    Connected,
}

/// Laufende oder klingelnde Zwei-Parteien-Session
#[derive(Debug, Clone)]
pub struct CallSession {
    pub id: SessionId,
    pub initiator: PeerId,
    pub responder: PeerId,
    pub state: CallState,
    pub erstellt: Instant,
}

impl CallSession {
    /// Gibt den Gespraechspartner von `peer_id` zurueck
    pub fn partner_von(&self, peer_id: &PeerId) -> Option<&PeerId> {
        if *peer_id == self.initiator {
            Some(&self.responder)
        } else if *peer_id == self.responder {
            Some(&self.initiator)
        } else {
            None
        }
    }

    /// Prueft ob die Session genau zwischen `initiator` und `responder` besteht
    pub fn passt_zu(&self, initiator: &PeerId, responder: &PeerId) -> bool {
        self.initiator == *initiator && self.responder == *responder
    }
}

/// Session-Tabelle
#[derive(Default)]
pub struct CallSessionManager {
    sessions: HashMap<SessionId, CallSession>,
    /// Peer -> Session (beide Teilnehmer jeder Session)
    teilnehmer: HashMap<PeerId, SessionId>,
}

impl CallSessionManager {
    /// Erstellt eine leere Session-Tabelle
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt eine klingelnde Session an
    ///
    /// Prueft in dieser Reihenfolge: Selbstanruf, Ziel besetzt, Anrufer besetzt.
    pub fn erstellen(&mut self, initiator: PeerId, responder: PeerId) -> SignalingResult<SessionId> {
        if initiator == responder {
            return Err(SignalingError::SelbstAnruf(initiator));
        }
        if self.ist_besetzt(&responder) {
            return Err(SignalingError::Besetzt(responder));
        }
        if self.ist_besetzt(&initiator) {
            return Err(SignalingError::BereitsImGespraech(initiator));
        }

        let id = SessionId::new();
        self.teilnehmer.insert(initiator.clone(), id);
        self.teilnehmer.insert(responder.clone(), id);
        self.sessions.insert(
            id,
            CallSession {
                id,
                initiator,
                responder,
                state: CallState::Ringing,
                erstellt: Instant::now(),
            },
        );
        Ok(id)
    }

    /// RINGING -> CONNECTED, nur wenn die Session genau (initiator, responder) ist
    pub fn annehmen(&mut self, initiator: &PeerId, responder: &PeerId) -> Option<&CallSession> {
        let id = *self.teilnehmer.get(responder)?;
        let session = self.sessions.get_mut(&id)?;
        if !session.passt_zu(initiator, responder) || session.state != CallState::Ringing {
            return None;
        }
        session.state = CallState::Connected;
        Some(&*session)
    }

    /// Entfernt die Session an der `peer_id` beteiligt ist (beide Index-Eintraege)
    pub fn entfernen_fuer(&mut self, peer_id: &PeerId) -> Option<CallSession> {
        let id = *self.teilnehmer.get(peer_id)?;
        self.entfernen(&id)
    }

    /// Entfernt eine Session anhand ihrer ID (beide Index-Eintraege)
    pub fn entfernen(&mut self, id: &SessionId) -> Option<CallSession> {
        let session = self.sessions.remove(id)?;
        self.teilnehmer.remove(&session.initiator);
        self.teilnehmer.remove(&session.responder);
        Some(session)
    }

    /// Session an der `peer_id` beteiligt ist
    pub fn session_von(&self, peer_id: &PeerId) -> Option<&CallSession> {
        self.teilnehmer
            .get(peer_id)
            .and_then(|id| self.sessions.get(id))
    }

    /// Session anhand ihrer ID
    pub fn session(&self, id: &SessionId) -> Option<&CallSession> {
        self.sessions.get(id)
    }

    /// Gespraechspartner von `peer_id`
    pub fn partner_von(&self, peer_id: &PeerId) -> Option<&PeerId> {
        self.session_von(peer_id)?.partner_von(peer_id)
    }

    /// Abgeleiteter Besetzt-Status
    pub fn ist_besetzt(&self, peer_id: &PeerId) -> bool {
        self.teilnehmer.contains_key(peer_id)
    }

    /// Anzahl aktiver Sessions (klingelnd oder verbunden)
    pub fn anzahl(&self) -> usize {
        self.sessions.len()
    }

    /// Alle Sessions
    pub fn alle(&self) -> impl Iterator<Item = &CallSession> {
        self.sessions.values()
    }

    /// Prueft Symmetrie und Eindeutigkeit des Teilnehmer-Index
    pub fn invarianten_pruefen(&self) -> Result<(), String> {
        if self.teilnehmer.len() != self.sessions.len() * 2 {
            return Err(format!(
                "{} Index-Eintraege fuer {} Sessions",
                self.teilnehmer.len(),
                self.sessions.len()
            ));
        }
        for session in self.sessions.values() {
            for peer in [&session.initiator, &session.responder] {
                if self.teilnehmer.get(peer) != Some(&session.id) {
                    return Err(format!("{peer} zeigt nicht auf {}", session.id));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
