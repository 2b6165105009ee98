//! Message-Relay – Zustandslose Weiterleitung an Peers
//!
//! Loest die Ziel-Kennung ueber die Registry auf und reiht die Nachricht in
//! die Send-Queue der Verbindung ein. Ist das Ziel nicht online, erfaehrt
//! der Absender das per `call-failed`. Nur ICE-Kandidaten werden in diesem
//! Fall still verworfen.

use parley_core::{ConnectionId, PeerId};
use parley_protocol::{FailureReason, ServerMessage};

use crate::registry::PeerRegistry;

/// Ergebnis einer Weiterleitung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zustellung {
    /// In die Send-Queue des Ziels eingereiht
    Zugestellt,
    /// Ziel ist nicht registriert
    NichtOnline,
    /// Ziel ist online, aber die Queue war voll oder geschlossen
    Verworfen,
}

/// Leitet eine Nachricht an eine Kennung weiter
pub fn weiterleiten(registry: &PeerRegistry, ziel: &PeerId, nachricht: ServerMessage) -> Zustellung {
    let Some(handle) = registry.nachschlagen(ziel) else {
        return Zustellung::NichtOnline;
    };

    let event = nachricht.event_name();
    if handle.senden(nachricht) {
        tracing::trace!(ziel = %ziel, event, "Nachricht weitergeleitet");
        Zustellung::Zugestellt
    } else {
        Zustellung::Verworfen
    }
}

/// Leitet weiter und meldet dem Absender `call-failed(not-online)` falls das
/// Ziel fehlt
pub fn weiterleiten_oder_melden(
    registry: &PeerRegistry,
    absender: &ConnectionId,
    ziel: &PeerId,
    nachricht: ServerMessage,
) -> Zustellung {
    let zustellung = weiterleiten(registry, ziel, nachricht);
    if zustellung == Zustellung::NichtOnline {
        tracing::debug!(ziel = %ziel, "Weiterleitung an Offline-Peer – Absender wird informiert");
        an_verbindung_senden(
            registry,
            absender,
            ServerMessage::call_failed(FailureReason::NotOnline),
        );
    }
    zustellung
}

/// Sendet direkt an eine Verbindung (z.B. Antworten an den Absender)
pub fn an_verbindung_senden(
    registry: &PeerRegistry,
    verbindung: &ConnectionId,
    nachricht: ServerMessage,
) -> bool {
    match registry.verbindung(verbindung) {
        Some(handle) => handle.senden(nachricht),
        None => {
            tracing::debug!(verbindung = %verbindung, "Senden an unbekannte Verbindung");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ConnectionHandle;
    use crate::testing::TestHandle;
    use std::sync::Arc;

    #[test]
    fn weiterleiten_an_online_peer() {
        let mut registry = PeerRegistry::neu();
        let bob = TestHandle::neu();
        registry.verbinden(Arc::new(bob.clone()));
        registry.registrieren(PeerId::new("bob"), bob.id()).unwrap();

        let zustellung = weiterleiten(&registry, &PeerId::new("bob"), ServerMessage::call_ended());

        assert_eq!(zustellung, Zustellung::Zugestellt);
        assert_eq!(bob.abholen(), vec![ServerMessage::call_ended()]);
    }

    #[test]
    fn offline_ziel_wird_dem_absender_gemeldet() {
        let mut registry = PeerRegistry::neu();
        let alice = TestHandle::neu();
        registry.verbinden(Arc::new(alice.clone()));

        let zustellung = weiterleiten_oder_melden(
            &registry,
            &alice.id(),
            &PeerId::new("ghost"),
            ServerMessage::call_ended(),
        );

        assert_eq!(zustellung, Zustellung::NichtOnline);
        assert_eq!(
            alice.abholen(),
            vec![ServerMessage::call_failed(FailureReason::NotOnline)]
        );
    }

    #[test]
    fn weiterleiten_an_offline_peer_ohne_meldung() {
        let registry = PeerRegistry::neu();
        assert_eq!(
            weiterleiten(&registry, &PeerId::new("ghost"), ServerMessage::call_ended()),
            Zustellung::NichtOnline
        );
    }
}
