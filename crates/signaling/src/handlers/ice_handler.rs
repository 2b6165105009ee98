//! ICE-Handler – Weiterleitung von Kandidaten an den Gespraechspartner

use parley_core::ConnectionId;
use parley_protocol::control::IceCandidateRequest;
use parley_protocol::ServerMessage;

use crate::handlers::absender_pruefen;
use crate::relay;
use crate::server_state::SignalingState;

/// Leitet einen ICE-Kandidaten weiter
///
/// Kandidaten sind best-effort: ohne Session, an einen anderen Peer als den
/// Partner oder an einen Offline-Peer werden sie still verworfen.
pub fn handle_ice_candidate(request: IceCandidateRequest, verbindung: ConnectionId, state: &mut SignalingState) {
    let Some(absender) = absender_pruefen(state, &verbindung, request.from.as_ref()) else {
        return;
    };

    if state.sessions.partner_von(&absender) != Some(&request.to) {
        tracing::trace!(von = %absender, an = %request.to, "Veralteter ICE-Kandidat verworfen");
        return;
    }

    relay::weiterleiten(
        &state.registry,
        &request.to,
        ServerMessage::ice_candidate(request.candidate),
    );
}
