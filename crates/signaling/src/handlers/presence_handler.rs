//! Presence-Handler – Registrieren und Trennen

use parley_core::event::CallOutcome;
use parley_core::ConnectionId;
use parley_protocol::control::RegisterRequest;
use parley_protocol::ServerMessage;

use crate::handlers::call_handler;
use crate::relay;
use crate::server_state::SignalingState;

/// Registriert die Kennung einer Verbindung
///
/// Letzte Registrierung gewinnt. Die alte Verbindung einer uebernommenen
/// Kennung verliert ihre Zuordnung, deshalb wird eine laufende Session
/// dieser Kennung abgebaut; Partner und alte Verbindung erhalten
/// `call-ended`. Wechselt eine Verbindung ihre Kennung, geht die alte
/// offline und deren Session wird ebenfalls abgebaut.
pub fn handle_register(request: RegisterRequest, verbindung: ConnectionId, state: &mut SignalingState) {
    let peer_id = request.peer_id;
    let Some(registrierung) = state.registry.registrieren(peer_id.clone(), verbindung) else {
        return;
    };

    if let Some(alte) = registrierung.abgeloeste_kennung {
        call_handler::session_abbauen(state, &alte, CallOutcome::Getrennt);
    }
    if let Some(alte_verbindung) = registrierung.uebernommen_von {
        if call_handler::session_abbauen(state, &peer_id, CallOutcome::Getrennt).is_some() {
            relay::an_verbindung_senden(&state.registry, &alte_verbindung, ServerMessage::call_ended());
        }
    }

    state.registry.presence_senden();
}

/// Raeumt nach einer getrennten Verbindung auf
///
/// Eine bereits uebernommene Verbindung hat keine Kennung mehr, ihr
/// Trennen aendert an Presence und Sessions nichts.
pub fn handle_disconnect(verbindung: ConnectionId, state: &mut SignalingState) {
    let Some(peer_id) = state.registry.entfernen(&verbindung) else {
        tracing::debug!(verbindung = %verbindung, "Unregistrierte Verbindung getrennt");
        return;
    };

    call_handler::session_abbauen(state, &peer_id, CallOutcome::Getrennt);
    state.registry.presence_senden();
}
