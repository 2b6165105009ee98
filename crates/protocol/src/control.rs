//! Signaling-Protokoll (WebSocket)
//!
//! Definiert alle Nachrichten die ueber die WebSocket-Verbindung zwischen
//! Browser-Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Jeder Frame ist ein JSON-Objekt `{"event": "...", "data": {...}}`
//! - Event-Namen in kebab-case (`call-request`, `users-online`, ...)
//! - SDP-Offer/Answer und ICE-Kandidaten sind opak (`serde_json::Value`)
//!   und werden vom Server nie interpretiert

use parley_core::types::PeerId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Fehlergruende
// ---------------------------------------------------------------------------

/// Grund fuer ein `call-failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// Ziel ist nicht registriert
    NotOnline,
    /// Anrufer ist bereits in einer Session
    AlreadyInCall,
    /// Anrufer und Ziel sind identisch
    SelfCall,
    /// Verbindung hat sich noch nicht registriert
    NotRegistered,
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Registrierung einer Peer-Kennung auf der aktuellen Verbindung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "peerId")]
    pub peer_id: PeerId,
}

/// Anruf-Anfrage mit SDP-Offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub to: PeerId,
    pub from: PeerId,
    pub offer: Value,
}

/// Annahme eines klingelnden Anrufs mit SDP-Answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAnswerRequest {
    pub to: PeerId,
    pub from: PeerId,
    pub answer: Value,
}

/// Ablehnung eines klingelnden Anrufs durch den Angerufenen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRejectRequest {
    pub to: PeerId,
    pub from: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// ICE-Kandidat fuer die Gegenseite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidateRequest {
    pub to: PeerId,
    /// Optional; falls gesetzt muss er der registrierten Kennung entsprechen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<PeerId>,
    pub candidate: Value,
}

/// Auflegen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndCallRequest {
    pub to: PeerId,
    pub from: PeerId,
}

/// Alle Nachrichten vom Client an den Server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    Register(RegisterRequest),
    CallRequest(CallRequest),
    CallAnswer(CallAnswerRequest),
    CallReject(CallRejectRequest),
    IceCandidate(IceCandidateRequest),
    EndCall(EndCallRequest),
}

impl ClientMessage {
    /// Event-Name fuer Logging und Metriken
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Register(_) => "register",
            Self::CallRequest(_) => "call-request",
            Self::CallAnswer(_) => "call-answer",
            Self::CallReject(_) => "call-reject",
            Self::IceCandidate(_) => "ice-candidate",
            Self::EndCall(_) => "end-call",
        }
    }

    /// Alle Peer-Kennungen die in der Nachricht vorkommen
    fn peer_ids(&self) -> Vec<&PeerId> {
        match self {
            Self::Register(r) => vec![&r.peer_id],
            Self::CallRequest(r) => vec![&r.to, &r.from],
            Self::CallAnswer(r) => vec![&r.to, &r.from],
            Self::CallReject(r) => vec![&r.to, &r.from],
            Self::IceCandidate(r) => {
                let mut ids = vec![&r.to];
                ids.extend(r.from.as_ref());
                ids
            }
            Self::EndCall(r) => vec![&r.to, &r.from],
        }
    }

    /// Prueft die Felder die serde nicht pruefen kann
    ///
    /// Gibt den Namen des ersten ungueltigen Felds zurueck.
    pub fn validieren(&self) -> Result<(), String> {
        match self.peer_ids().into_iter().find(|id| !id.ist_gueltig()) {
            Some(id) => Err(format!("ungueltige Peer-Kennung '{id}'")),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Klingelnder Anruf beim Angerufenen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingCall {
    pub from: PeerId,
    pub offer: Value,
}

/// Anruf wurde vom Angerufenen angenommen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallAnswered {
    pub from: PeerId,
    pub answer: Value,
}

/// Anruf wurde vom Angerufenen abgelehnt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRejected {
    pub from: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Weitergeleiteter ICE-Kandidat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: Value,
}

/// Gegenseite hat aufgelegt oder die Verbindung verloren
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallEnded {}

/// Anruf konnte nicht zugestellt werden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallFailed {
    pub reason: FailureReason,
}

/// Ziel ist bereits in einer Session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserBusy {
    #[serde(rename = "peerId")]
    pub peer_id: PeerId,
}

/// Alle Nachrichten vom Server an den Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    UsersOnline(Vec<PeerId>),
    IncomingCall(IncomingCall),
    CallAnswered(CallAnswered),
    CallRejected(CallRejected),
    IceCandidate(IceCandidate),
    CallEnded(CallEnded),
    CallFailed(CallFailed),
    UserBusy(UserBusy),
}

impl ServerMessage {
    pub fn users_online(peers: Vec<PeerId>) -> Self {
        Self::UsersOnline(peers)
    }

    pub fn incoming_call(from: PeerId, offer: Value) -> Self {
        Self::IncomingCall(IncomingCall { from, offer })
    }

    pub fn call_answered(from: PeerId, answer: Value) -> Self {
        Self::CallAnswered(CallAnswered { from, answer })
    }

    pub fn call_rejected(from: PeerId, reason: Option<String>) -> Self {
        Self::CallRejected(CallRejected { from, reason })
    }

    pub fn ice_candidate(candidate: Value) -> Self {
        Self::IceCandidate(IceCandidate { candidate })
    }

    pub fn call_ended() -> Self {
        Self::CallEnded(CallEnded {})
    }

    pub fn call_failed(reason: FailureReason) -> Self {
        Self::CallFailed(CallFailed { reason })
    }

    pub fn user_busy(peer_id: PeerId) -> Self {
        Self::UserBusy(UserBusy { peer_id })
    }

    /// Event-Name fuer Logging
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::UsersOnline(_) => "users-online",
            Self::IncomingCall(_) => "incoming-call",
            Self::CallAnswered(_) => "call-answered",
            Self::CallRejected(_) => "call-rejected",
            Self::IceCandidate(_) => "ice-candidate",
            Self::CallEnded(_) => "call-ended",
            Self::CallFailed(_) => "call-failed",
            Self::UserBusy(_) => "user-busy",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
