//! Call-Handler – Request, Answer, Reject, End, Klingel-Timeout
//!
//! Alle Wege, die eine Session beenden (Auflegen, Ablehnen, Trennen,
//! Timeout), laufen ueber `session_abbauen`, damit immer beide Teilnehmer
//! gleichzeitig frei werden.

use parley_core::event::{CallOutcome, ParleyEvent};
use parley_core::{ConnectionId, PeerId, SessionId};
use parley_protocol::control::{CallAnswerRequest, CallRejectRequest, CallRequest, EndCallRequest};
use parley_protocol::{FailureReason, ServerMessage};

use crate::error::SignalingError;
use crate::handlers::absender_pruefen;
use crate::relay::{self, Zustellung};
use crate::server_state::SignalingState;
use crate::session::{CallSession, CallState};

/// Verarbeitet eine Anruf-Anfrage
///
/// Reihenfolge der Pruefungen: Ziel online, Ziel frei, Anrufer frei.
pub fn handle_call_request(request: CallRequest, verbindung: ConnectionId, state: &mut SignalingState) {
    let Some(anrufer) = state.registry.kennung_von(&verbindung).cloned() else {
        tracing::warn!(verbindung = %verbindung, "Anruf von nicht registrierter Verbindung");
        relay::an_verbindung_senden(
            &state.registry,
            &verbindung,
            ServerMessage::call_failed(FailureReason::NotRegistered),
        );
        return;
    };
    if request.from != anrufer {
        tracing::warn!(
            verbindung = %verbindung,
            registriert = %anrufer,
            behauptet = %request.from,
            "Absender passt nicht zur Registrierung – Anruf ignoriert"
        );
        return;
    }

    let ziel = request.to;
    if !state.registry.ist_online(&ziel) {
        tracing::info!(von = %anrufer, an = %ziel, "Anruf an Offline-Peer");
        ablehnen(state, &verbindung, ServerMessage::call_failed(FailureReason::NotOnline), CallOutcome::NichtOnline);
        return;
    }

    let session_id = match state.sessions.erstellen(anrufer.clone(), ziel.clone()) {
        Ok(id) => id,
        Err(SignalingError::Besetzt(besetzt)) => {
            tracing::info!(von = %anrufer, an = %besetzt, "Ziel besetzt");
            ablehnen(state, &verbindung, ServerMessage::user_busy(besetzt), CallOutcome::Besetzt);
            return;
        }
        Err(SignalingError::BereitsImGespraech(_)) => {
            tracing::info!(von = %anrufer, an = %ziel, "Anrufer ist bereits in einem Gespraech");
            ablehnen(
                state,
                &verbindung,
                ServerMessage::call_failed(FailureReason::AlreadyInCall),
                CallOutcome::Abgewiesen,
            );
            return;
        }
        Err(SignalingError::SelbstAnruf(_)) => {
            tracing::info!(von = %anrufer, "Selbstanruf abgewiesen");
            ablehnen(
                state,
                &verbindung,
                ServerMessage::call_failed(FailureReason::SelfCall),
                CallOutcome::Abgewiesen,
            );
            return;
        }
        Err(e) => {
            tracing::error!(fehler = %e, "Session konnte nicht angelegt werden");
            return;
        }
    };

    let zustellung = relay::weiterleiten(
        &state.registry,
        &ziel,
        ServerMessage::incoming_call(anrufer.clone(), request.offer),
    );
    if zustellung != Zustellung::Zugestellt {
        // Ziel hat den Anruf nie gesehen: Session sofort wieder abbauen
        tracing::warn!(von = %anrufer, an = %ziel, ?zustellung, "Incoming-Call nicht zustellbar");
        state.sessions.entfernen(&session_id);
        ablehnen(state, &verbindung, ServerMessage::call_failed(FailureReason::NotOnline), CallOutcome::NichtOnline);
        return;
    }

    tracing::info!(session = %session_id, von = %anrufer, an = %ziel, "Anruf klingelt");
    state.event_senden(ParleyEvent::AnrufGestartet {
        session_id,
        initiator: anrufer,
        responder: ziel,
    });
    state.klingel_timeout_planen(session_id);
}

/// Verarbeitet die Annahme eines klingelnden Anrufs
pub fn handle_call_answer(request: CallAnswerRequest, verbindung: ConnectionId, state: &mut SignalingState) {
    let Some(angerufener) = absender_pruefen(state, &verbindung, Some(&request.from)) else {
        return;
    };

    let Some(session_id) = state
        .sessions
        .annehmen(&request.to, &angerufener)
        .map(|s| s.id)
    else {
        tracing::debug!(von = %angerufener, an = %request.to, "Veraltete Anruf-Annahme verworfen");
        return;
    };

    tracing::info!(session = %session_id, von = %angerufener, an = %request.to, "Anruf verbunden");
    state.event_senden(ParleyEvent::AnrufVerbunden { session_id });
    relay::weiterleiten_oder_melden(
        &state.registry,
        &verbindung,
        &request.to,
        ServerMessage::call_answered(angerufener, request.answer),
    );
}

/// Verarbeitet die Ablehnung eines klingelnden Anrufs
pub fn handle_call_reject(request: CallRejectRequest, verbindung: ConnectionId, state: &mut SignalingState) {
    let Some(angerufener) = absender_pruefen(state, &verbindung, Some(&request.from)) else {
        return;
    };

    let klingelt = state
        .sessions
        .session_von(&angerufener)
        .is_some_and(|s| s.passt_zu(&request.to, &angerufener) && s.state == CallState::Ringing);
    if !klingelt {
        tracing::debug!(von = %angerufener, an = %request.to, "Veraltete Ablehnung verworfen");
        return;
    }

    abbauen_mit(
        state,
        &angerufener,
        CallOutcome::Abgelehnt,
        ServerMessage::call_rejected(angerufener.clone(), request.reason),
    );
}

/// Verarbeitet das Auflegen
///
/// Ein `end-call` dessen `to` nicht der aktuelle Partner ist, gehoert zu
/// einer frueheren Session und wird verworfen.
pub fn handle_end_call(request: EndCallRequest, verbindung: ConnectionId, state: &mut SignalingState) {
    let Some(anrufer) = absender_pruefen(state, &verbindung, Some(&request.from)) else {
        return;
    };

    if state.sessions.partner_von(&anrufer) != Some(&request.to) {
        tracing::debug!(von = %anrufer, an = %request.to, "Veraltetes Auflegen verworfen");
        return;
    }

    session_abbauen(state, &anrufer, CallOutcome::Beendet);
}

/// Klingel-Timeout: beide Seiten erhalten `call-ended`
pub fn handle_klingel_timeout(session_id: SessionId, state: &mut SignalingState) {
    let initiator = match state.sessions.session(&session_id) {
        Some(session) if session.state == CallState::Ringing => session.initiator.clone(),
        _ => {
            tracing::trace!(session = %session_id, "Klingel-Timeout fuer beendete oder verbundene Session");
            return;
        }
    };

    tracing::info!(session = %session_id, "Klingel-Timeout – niemand hat angenommen");
    if let Some(session) = abbauen_mit(
        state,
        &initiator,
        CallOutcome::Zeitueberschreitung,
        ServerMessage::call_ended(),
    ) {
        relay::weiterleiten(&state.registry, &session.initiator, ServerMessage::call_ended());
    }
}

/// Baut die Session von `peer_id` ab und sendet dem Partner `call-ended`
///
/// Gemeinsamer Pfad fuer Auflegen, Trennen und Kennungswechsel.
pub fn session_abbauen(
    state: &mut SignalingState,
    peer_id: &PeerId,
    outcome: CallOutcome,
) -> Option<CallSession> {
    abbauen_mit(state, peer_id, outcome, ServerMessage::call_ended())
}

fn abbauen_mit(
    state: &mut SignalingState,
    peer_id: &PeerId,
    outcome: CallOutcome,
    an_partner: ServerMessage,
) -> Option<CallSession> {
    let session = state.sessions.entfernen_fuer(peer_id)?;

    if let Some(partner) = session.partner_von(peer_id) {
        if relay::weiterleiten(&state.registry, partner, an_partner) == Zustellung::NichtOnline {
            tracing::debug!(partner = %partner, "Partner bereits offline – keine Benachrichtigung");
        }
    }

    tracing::info!(
        session = %session.id,
        initiator = %session.initiator,
        responder = %session.responder,
        outcome = outcome.label(),
        dauer_ms = session.erstellt.elapsed().as_millis() as u64,
        "Session beendet"
    );
    state.event_senden(ParleyEvent::AnrufBeendet {
        session_id: session.id,
        outcome,
    });
    Some(session)
}

/// Antwortet dem Anrufer ohne Session anzulegen
fn ablehnen(
    state: &SignalingState,
    verbindung: &ConnectionId,
    antwort: ServerMessage,
    outcome: CallOutcome,
) {
    relay::an_verbindung_senden(&state.registry, verbindung, antwort);
    state.event_senden(ParleyEvent::AnrufAbgewiesen { outcome });
}
