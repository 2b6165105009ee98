//! Handler fuer alle Client-Nachrichten
//!
//! Alle Handler sind synchrone Funktionen auf `&mut SignalingState`. Sie
//! laufen vollstaendig durch, bevor die Event-Loop das naechste Ereignis
//! annimmt; zwischen Verfuegbarkeitspruefung und Session-Anlage liegt nie ein
//! `.await`.

pub mod call_handler;
pub mod ice_handler;
pub mod presence_handler;

use parley_core::{ConnectionId, PeerId};

use crate::server_state::SignalingState;

/// Ermittelt die registrierte Kennung des Absenders
///
/// Gibt `None` zurueck (Nachricht ignorieren) wenn die Verbindung nicht
/// registriert ist oder ein mitgeschicktes `from` nicht passt.
pub(crate) fn absender_pruefen(
    state: &SignalingState,
    verbindung: &ConnectionId,
    behauptet: Option<&PeerId>,
) -> Option<PeerId> {
    let Some(kennung) = state.registry.kennung_von(verbindung) else {
        tracing::warn!(verbindung = %verbindung, "Nachricht von nicht registrierter Verbindung ignoriert");
        return None;
    };

    if let Some(behauptet) = behauptet {
        if behauptet != kennung {
            tracing::warn!(
                verbindung = %verbindung,
                registriert = %kennung,
                behauptet = %behauptet,
                "Absender passt nicht zur Registrierung – Nachricht ignoriert"
            );
            return None;
        }
    }

    Some(kennung.clone())
}
