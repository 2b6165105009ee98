//! Message-Dispatcher – Routet Client-Nachrichten an die richtigen Handler
//!
//! Der Dispatcher besitzt den `SignalingState` exklusiv. Jede Methode laeuft
//! vollstaendig durch, bevor das naechste Ereignis verarbeitet wird.
//!
//! ## Absenderpruefung
//! - `register` ist auf jeder Verbindung erlaubt
//! - `call-request` von unregistrierten Verbindungen wird mit
//!   `call-failed(not-registered)` beantwortet
//! - alle anderen Nachrichten werden nur von registrierten Verbindungen
//!   angenommen, deren `from` zur Registrierung passt

use parley_core::event::ParleyEvent;
use parley_core::{ConnectionId, SessionId};
use parley_protocol::{ClientMessage, ServerMessage};
use std::sync::Arc;

use crate::handle::ConnectionHandle;
use crate::handlers::{call_handler, ice_handler, presence_handler};
use crate::relay;
use crate::server_state::SignalingState;

/// Zentraler Message-Dispatcher
pub struct MessageDispatcher {
    state: SignalingState,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: SignalingState) -> Self {
        Self { state }
    }

    /// Lesezugriff auf den Zustand
    pub fn state(&self) -> &SignalingState {
        &self.state
    }

    /// Nimmt eine neue Verbindung auf und sendet ihr die aktuelle Presence
    pub fn verbindung_oeffnen(&mut self, handle: Arc<dyn ConnectionHandle>) {
        let id = handle.id();
        self.state.registry.verbinden(handle);
        relay::an_verbindung_senden(
            &self.state.registry,
            &id,
            ServerMessage::users_online(self.state.registry.online_peers()),
        );
        self.state.zustand_melden();
    }

    /// Verarbeitet eine eingehende Client-Nachricht
    pub fn dispatch(&mut self, verbindung: ConnectionId, nachricht: ClientMessage) {
        let event = nachricht.event_name();
        tracing::trace!(verbindung = %verbindung, event, "Nachricht empfangen");

        match nachricht {
            // -------------------------------------------------------------------
            // Presence
            // -------------------------------------------------------------------
            ClientMessage::Register(req) => {
                presence_handler::handle_register(req, verbindung, &mut self.state)
            }

            // -------------------------------------------------------------------
            // Anruf-Lebenszyklus
            // -------------------------------------------------------------------
            ClientMessage::CallRequest(req) => {
                call_handler::handle_call_request(req, verbindung, &mut self.state)
            }
            ClientMessage::CallAnswer(req) => {
                call_handler::handle_call_answer(req, verbindung, &mut self.state)
            }
            ClientMessage::CallReject(req) => {
                call_handler::handle_call_reject(req, verbindung, &mut self.state)
            }
            ClientMessage::EndCall(req) => {
                call_handler::handle_end_call(req, verbindung, &mut self.state)
            }

            // -------------------------------------------------------------------
            // Relay
            // -------------------------------------------------------------------
            ClientMessage::IceCandidate(req) => {
                ice_handler::handle_ice_candidate(req, verbindung, &mut self.state)
            }
        }

        self.state.event_senden(ParleyEvent::NachrichtVerarbeitet {
            event: event.to_string(),
        });
        self.state.zustand_melden();
    }

    /// Raeumt nach einer getrennten Verbindung auf
    pub fn verbindung_schliessen(&mut self, verbindung: ConnectionId) {
        presence_handler::handle_disconnect(verbindung, &mut self.state);
        self.state.zustand_melden();
    }

    /// Klingel-Timeout einer Session ist abgelaufen
    pub fn klingel_timeout(&mut self, session_id: SessionId) {
        call_handler::handle_klingel_timeout(session_id, &mut self.state);
        self.state.zustand_melden();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_state::{KlingelTimer, SignalingConfig};
    use crate::session::CallState;
    use crate::testing::TestHandle;
    use parking_lot::Mutex;
    use parley_core::event::{CallOutcome, EventBus};
    use parley_core::PeerId;
    use parley_protocol::control::{
        CallAnswerRequest, CallRejectRequest, CallRequest, EndCallRequest, IceCandidateRequest,
        RegisterRequest,
    };
    use parley_protocol::FailureReason;
    use serde_json::json;
    use std::time::Duration;

    fn peer(id: &str) -> PeerId {
        PeerId::new(id)
    }

    fn dispatcher() -> MessageDispatcher {
        MessageDispatcher::neu(SignalingState::neu(SignalingConfig::default()))
    }

    /// Verbindet und registriert einen Client; leert das Postfach
    fn anmelden(d: &mut MessageDispatcher, kennung: &str) -> TestHandle {
        let handle = TestHandle::neu();
        d.verbindung_oeffnen(Arc::new(handle.clone()));
        d.dispatch(
            handle.id(),
            ClientMessage::Register(RegisterRequest {
                peer_id: peer(kennung),
            }),
        );
        handle.abholen();
        handle
    }

    fn anrufen(d: &mut MessageDispatcher, von: &TestHandle, a: &str, b: &str) {
        d.dispatch(
            von.id(),
            ClientMessage::CallRequest(CallRequest {
                to: peer(b),
                from: peer(a),
                offer: json!({"type": "offer", "sdp": format!("v=0 {a}")}),
            }),
        );
    }

    fn annehmen(d: &mut MessageDispatcher, von: &TestHandle, b: &str, a: &str) {
        d.dispatch(
            von.id(),
            ClientMessage::CallAnswer(CallAnswerRequest {
                to: peer(a),
                from: peer(b),
                answer: json!({"type": "answer", "sdp": "v=0"}),
            }),
        );
    }

    fn auflegen(d: &mut MessageDispatcher, von: &TestHandle, a: &str, b: &str) {
        d.dispatch(
            von.id(),
            ClientMessage::EndCall(EndCallRequest {
                to: peer(b),
                from: peer(a),
            }),
        );
    }

    fn ice(d: &mut MessageDispatcher, von: &TestHandle, an: &str) {
        d.dispatch(
            von.id(),
            ClientMessage::IceCandidate(IceCandidateRequest {
                to: peer(an),
                from: None,
                candidate: json!({"candidate": "candidate:1 1 udp 1 10.0.0.1 5000 typ host"}),
            }),
        );
    }

    fn besetzt(d: &MessageDispatcher, kennung: &str) -> bool {
        d.state().sessions.ist_besetzt(&peer(kennung))
    }

    /// Zeichnet alle Ereignisse auf
    #[derive(Clone, Default)]
    struct TestBus {
        events: Arc<Mutex<Vec<ParleyEvent>>>,
    }

    impl EventBus for TestBus {
        fn senden(&self, event: ParleyEvent) -> parley_core::Result<()> {
            self.events.lock().push(event);
            Ok(())
        }
    }

    impl TestBus {
        fn outcomes(&self) -> Vec<CallOutcome> {
            self.events
                .lock()
                .iter()
                .filter_map(|e| match e {
                    ParleyEvent::AnrufBeendet { outcome, .. } => Some(*outcome),
                    ParleyEvent::AnrufAbgewiesen { outcome } => Some(*outcome),
                    _ => None,
                })
                .collect()
        }
    }

    /// Merkt sich geplante Timeouts statt zu schlafen
    #[derive(Clone, Default)]
    struct TestTimer {
        geplant: Arc<Mutex<Vec<(SessionId, Duration)>>>,
    }

    impl KlingelTimer for TestTimer {
        fn planen(&self, session_id: SessionId, nach: Duration) {
            self.geplant.lock().push((session_id, nach));
        }
    }

    // -----------------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------------

    #[test]
    fn neue_verbindung_erhaelt_presence() {
        let mut d = dispatcher();
        let _alice = anmelden(&mut d, "alice");

        let neu = TestHandle::neu();
        d.verbindung_oeffnen(Arc::new(neu.clone()));
        assert_eq!(neu.abholen(), vec![ServerMessage::users_online(vec![peer("alice")])]);
    }

    #[test]
    fn registrieren_sendet_presence_an_alle() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let zuschauer = TestHandle::neu();
        d.verbindung_oeffnen(Arc::new(zuschauer.clone()));
        zuschauer.abholen();

        let _bob = anmelden(&mut d, "bob");

        let erwartet = Some(vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(alice.letzte_presence(), erwartet);
        assert_eq!(zuschauer.letzte_presence(), erwartet);
    }

    #[test]
    fn trennen_entfernt_presence() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        alice.abholen();

        d.verbindung_schliessen(bob.id());

        assert_eq!(alice.letzte_presence(), Some(vec!["alice".to_string()]));
        assert!(!d.state().registry.ist_online(&peer("bob")));
    }

    // -----------------------------------------------------------------------
    // Anruf-Lebenszyklus
    // -----------------------------------------------------------------------

    #[test]
    fn kompletter_anruf() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        alice.abholen();

        anrufen(&mut d, &alice, "alice", "bob");
        assert_eq!(
            bob.abholen_ohne_presence(),
            vec![ServerMessage::incoming_call(
                peer("alice"),
                json!({"type": "offer", "sdp": "v=0 alice"})
            )]
        );
        assert!(besetzt(&d, "alice") && besetzt(&d, "bob"));

        annehmen(&mut d, &bob, "bob", "alice");
        assert_eq!(
            alice.abholen_ohne_presence(),
            vec![ServerMessage::call_answered(
                peer("bob"),
                json!({"type": "answer", "sdp": "v=0"})
            )]
        );
        assert_eq!(
            d.state().sessions.session_von(&peer("alice")).map(|s| s.state),
            Some(CallState::Connected)
        );

        ice(&mut d, &alice, "bob");
        ice(&mut d, &bob, "alice");
        assert_eq!(bob.abholen_ohne_presence().len(), 1);
        assert_eq!(alice.abholen_ohne_presence().len(), 1);

        auflegen(&mut d, &alice, "alice", "bob");
        assert_eq!(bob.abholen_ohne_presence(), vec![ServerMessage::call_ended()]);
        assert!(alice.abholen_ohne_presence().is_empty());
        assert!(!besetzt(&d, "alice") && !besetzt(&d, "bob"));
        d.state().invarianten_pruefen().unwrap();
    }

    #[test]
    fn anruf_an_offline_peer() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");

        anrufen(&mut d, &alice, "alice", "ghost");

        assert_eq!(
            alice.abholen_ohne_presence(),
            vec![ServerMessage::call_failed(FailureReason::NotOnline)]
        );
        assert_eq!(d.state().sessions.anzahl(), 0);
        assert!(!besetzt(&d, "alice"));
    }

    #[test]
    fn anruf_an_besetzten_peer() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        let carol = anmelden(&mut d, "carol");
        anrufen(&mut d, &alice, "alice", "bob");
        bob.abholen();

        anrufen(&mut d, &carol, "carol", "bob");

        assert_eq!(
            carol.abholen_ohne_presence(),
            vec![ServerMessage::user_busy(peer("bob"))]
        );
        assert!(bob.abholen_ohne_presence().is_empty());
        assert!(!besetzt(&d, "carol"));
        assert_eq!(d.state().sessions.partner_von(&peer("bob")), Some(&peer("alice")));
    }

    #[test]
    fn anrufer_bereits_im_gespraech() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let _bob = anmelden(&mut d, "bob");
        let carol = anmelden(&mut d, "carol");
        anrufen(&mut d, &alice, "alice", "bob");
        alice.abholen();

        anrufen(&mut d, &alice, "alice", "carol");

        assert_eq!(
            alice.abholen_ohne_presence(),
            vec![ServerMessage::call_failed(FailureReason::AlreadyInCall)]
        );
        assert!(carol.abholen_ohne_presence().is_empty());
    }

    #[test]
    fn selbstanruf() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");

        anrufen(&mut d, &alice, "alice", "alice");

        assert_eq!(
            alice.abholen_ohne_presence(),
            vec![ServerMessage::call_failed(FailureReason::SelfCall)]
        );
        assert_eq!(d.state().sessions.anzahl(), 0);
    }

    #[test]
    fn anruf_ohne_registrierung() {
        let mut d = dispatcher();
        let _bob = anmelden(&mut d, "bob");
        let anonym = TestHandle::neu();
        d.verbindung_oeffnen(Arc::new(anonym.clone()));
        anonym.abholen();

        anrufen(&mut d, &anonym, "alice", "bob");

        assert_eq!(
            anonym.abholen_ohne_presence(),
            vec![ServerMessage::call_failed(FailureReason::NotRegistered)]
        );
        assert_eq!(d.state().sessions.anzahl(), 0);
    }

    #[test]
    fn gefaelschter_absender_wird_ignoriert() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        let _carol = anmelden(&mut d, "carol");

        anrufen(&mut d, &alice, "carol", "bob");

        assert!(alice.abholen_ohne_presence().is_empty());
        assert!(bob.abholen_ohne_presence().is_empty());
        assert_eq!(d.state().sessions.anzahl(), 0);
    }

    #[test]
    fn ablehnen_benachrichtigt_anrufer() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");

        d.dispatch(
            bob.id(),
            ClientMessage::CallReject(CallRejectRequest {
                to: peer("alice"),
                from: peer("bob"),
                reason: Some("declined".into()),
            }),
        );

        assert_eq!(
            alice.abholen_ohne_presence(),
            vec![ServerMessage::call_rejected(peer("bob"), Some("declined".into()))]
        );
        assert!(!besetzt(&d, "alice") && !besetzt(&d, "bob"));
    }

    #[test]
    fn ablehnen_nach_annahme_wird_ignoriert() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");
        annehmen(&mut d, &bob, "bob", "alice");
        alice.abholen();

        d.dispatch(
            bob.id(),
            ClientMessage::CallReject(CallRejectRequest {
                to: peer("alice"),
                from: peer("bob"),
                reason: None,
            }),
        );

        assert!(alice.abholen_ohne_presence().is_empty());
        assert!(besetzt(&d, "alice"));
    }

    // -----------------------------------------------------------------------
    // Trennen
    // -----------------------------------------------------------------------

    #[test]
    fn trennen_waehrend_klingeln() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");
        alice.abholen();

        d.verbindung_schliessen(bob.id());

        assert_eq!(alice.abholen_ohne_presence(), vec![ServerMessage::call_ended()]);
        assert!(!besetzt(&d, "alice"));
        d.state().invarianten_pruefen().unwrap();
    }

    #[test]
    fn trennen_waehrend_gespraech() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");
        annehmen(&mut d, &bob, "bob", "alice");
        bob.abholen();

        d.verbindung_schliessen(alice.id());

        assert_eq!(bob.letzte_presence(), Some(vec!["bob".to_string()]));
        assert_eq!(bob.abholen_ohne_presence(), vec![ServerMessage::call_ended()]);
        assert!(!besetzt(&d, "bob"));

        // Bob kann sofort wieder angerufen werden
        let carol = anmelden(&mut d, "carol");
        anrufen(&mut d, &carol, "carol", "bob");
        assert_eq!(bob.abholen_ohne_presence().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Nebenlaeufigkeit und veraltete Nachrichten
    // -----------------------------------------------------------------------

    #[test]
    fn gleichzeitige_anrufe_ergeben_eine_session() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");

        anrufen(&mut d, &alice, "alice", "bob");
        anrufen(&mut d, &bob, "bob", "alice");

        assert_eq!(d.state().sessions.anzahl(), 1);
        let session = d.state().sessions.session_von(&peer("alice")).unwrap();
        assert!(session.passt_zu(&peer("alice"), &peer("bob")));
        assert_eq!(
            bob.abholen_ohne_presence(),
            vec![
                ServerMessage::incoming_call(peer("alice"), json!({"type": "offer", "sdp": "v=0 alice"})),
                ServerMessage::user_busy(peer("alice")),
            ]
        );
        d.state().invarianten_pruefen().unwrap();
    }

    #[test]
    fn konkurrierende_anrufer() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        let carol = anmelden(&mut d, "carol");

        anrufen(&mut d, &alice, "alice", "bob");
        anrufen(&mut d, &carol, "carol", "bob");

        assert_eq!(d.state().sessions.anzahl(), 1);
        assert_eq!(bob.abholen_ohne_presence().len(), 1);
        assert_eq!(
            carol.abholen_ohne_presence(),
            vec![ServerMessage::user_busy(peer("bob"))]
        );
        assert!(alice.abholen_ohne_presence().is_empty());
    }

    #[test]
    fn veraltete_annahme_wird_verworfen() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");
        auflegen(&mut d, &alice, "alice", "bob");
        alice.abholen();

        annehmen(&mut d, &bob, "bob", "alice");

        assert!(alice.abholen_ohne_presence().is_empty());
        assert_eq!(d.state().sessions.anzahl(), 0);
    }

    #[test]
    fn ice_ohne_session_wird_verworfen() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        let carol = anmelden(&mut d, "carol");
        anrufen(&mut d, &alice, "alice", "bob");
        bob.abholen();

        // Kein Partner: Carol hat keine Session mit Bob
        ice(&mut d, &carol, "bob");
        // Falscher Partner: Alice spricht mit Bob, nicht mit Carol
        ice(&mut d, &alice, "carol");

        assert!(bob.abholen_ohne_presence().is_empty());
        assert!(carol.abholen_ohne_presence().is_empty());
        assert!(alice.abholen_ohne_presence().is_empty());
    }

    #[test]
    fn veraltetes_auflegen_beendet_neue_session_nicht() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let _bob = anmelden(&mut d, "bob");
        let carol = anmelden(&mut d, "carol");
        anrufen(&mut d, &alice, "alice", "bob");
        auflegen(&mut d, &alice, "alice", "bob");
        anrufen(&mut d, &alice, "alice", "carol");
        carol.abholen();

        // Spaetes end-call an Bob
        auflegen(&mut d, &alice, "alice", "bob");

        assert_eq!(d.state().sessions.partner_von(&peer("alice")), Some(&peer("carol")));
        assert!(carol.abholen_ohne_presence().is_empty());
    }

    // -----------------------------------------------------------------------
    // Uebernahme einer Kennung
    // -----------------------------------------------------------------------

    #[test]
    fn uebernahme_beendet_laufende_session() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob_alt = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");
        annehmen(&mut d, &bob_alt, "bob", "alice");
        alice.abholen();
        bob_alt.abholen();

        let bob_neu = anmelden(&mut d, "bob");

        assert_eq!(alice.abholen_ohne_presence(), vec![ServerMessage::call_ended()]);
        assert_eq!(bob_alt.abholen_ohne_presence(), vec![ServerMessage::call_ended()]);
        assert!(!besetzt(&d, "alice"));
        assert!(!besetzt(&d, "bob"));
        assert!(d.state().registry.ist_online(&peer("bob")));
        d.state().invarianten_pruefen().unwrap();

        // Alte Verbindung hat keine Kennung mehr
        auflegen(&mut d, &bob_alt, "bob", "alice");
        d.verbindung_schliessen(bob_alt.id());
        assert!(d.state().registry.ist_online(&peer("bob")));
        assert!(alice.abholen_ohne_presence().is_empty());

        // Beide koennen sofort neu telefonieren
        anrufen(&mut d, &alice, "alice", "bob");
        let eingehend = bob_neu.abholen_ohne_presence();
        assert_eq!(eingehend.len(), 1);
        assert_eq!(eingehend[0].event_name(), "incoming-call");
        d.state().invarianten_pruefen().unwrap();
    }

    #[test]
    fn uebernahme_ohne_session_sendet_kein_auflegen() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob_alt = anmelden(&mut d, "bob");
        let _bob_neu = anmelden(&mut d, "bob");

        assert!(alice.abholen_ohne_presence().is_empty());
        assert!(bob_alt.abholen_ohne_presence().is_empty());
        assert!(d.state().registry.ist_online(&peer("bob")));
    }

    #[test]
    fn kennungswechsel_beendet_alte_session() {
        let mut d = dispatcher();
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");
        alice.abholen();

        d.dispatch(
            bob.id(),
            ClientMessage::Register(RegisterRequest {
                peer_id: peer("robert"),
            }),
        );

        assert_eq!(
            alice.letzte_presence(),
            Some(vec!["alice".to_string(), "robert".to_string()])
        );
        assert_eq!(alice.abholen_ohne_presence(), vec![ServerMessage::call_ended()]);
        d.state().invarianten_pruefen().unwrap();
    }

    // -----------------------------------------------------------------------
    // Klingel-Timeout und Ereignisse
    // -----------------------------------------------------------------------

    #[test]
    fn klingel_timeout_beendet_beide_seiten() {
        let timer = TestTimer::default();
        let config = SignalingConfig {
            klingel_timeout_sek: Some(30),
            ..Default::default()
        };
        let mut d = MessageDispatcher::neu(
            SignalingState::neu(config).mit_klingel_timer(Box::new(timer.clone())),
        );
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");
        bob.abholen();

        let (session_id, nach) = timer.geplant.lock()[0];
        assert_eq!(nach, Duration::from_secs(30));

        d.klingel_timeout(session_id);

        assert_eq!(alice.abholen_ohne_presence(), vec![ServerMessage::call_ended()]);
        assert_eq!(bob.abholen_ohne_presence(), vec![ServerMessage::call_ended()]);
        assert_eq!(d.state().sessions.anzahl(), 0);
    }

    #[test]
    fn klingel_timeout_nach_annahme_ohne_wirkung() {
        let timer = TestTimer::default();
        let config = SignalingConfig {
            klingel_timeout_sek: Some(30),
            ..Default::default()
        };
        let mut d = MessageDispatcher::neu(
            SignalingState::neu(config).mit_klingel_timer(Box::new(timer.clone())),
        );
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");
        annehmen(&mut d, &bob, "bob", "alice");
        alice.abholen();
        bob.abholen();

        let (session_id, _) = timer.geplant.lock()[0];
        d.klingel_timeout(session_id);

        assert!(alice.abholen_ohne_presence().is_empty());
        assert!(bob.abholen_ohne_presence().is_empty());
        assert_eq!(d.state().sessions.anzahl(), 1);
    }

    #[test]
    fn ohne_klingel_timeout_wird_nichts_geplant() {
        let timer = TestTimer::default();
        let mut d = MessageDispatcher::neu(
            SignalingState::neu(SignalingConfig::default()).mit_klingel_timer(Box::new(timer.clone())),
        );
        let alice = anmelden(&mut d, "alice");
        let _bob = anmelden(&mut d, "bob");
        anrufen(&mut d, &alice, "alice", "bob");

        assert!(timer.geplant.lock().is_empty());
    }

    #[test]
    fn ereignisse_fuer_anruf_ergebnisse() {
        let bus = TestBus::default();
        let mut d = MessageDispatcher::neu(
            SignalingState::neu(SignalingConfig::default()).mit_event_bus(Arc::new(bus.clone())),
        );
        let alice = anmelden(&mut d, "alice");
        let bob = anmelden(&mut d, "bob");

        anrufen(&mut d, &alice, "alice", "ghost");
        anrufen(&mut d, &alice, "alice", "bob");
        annehmen(&mut d, &bob, "bob", "alice");
        auflegen(&mut d, &bob, "bob", "alice");

        assert_eq!(
            bus.outcomes(),
            vec![CallOutcome::NichtOnline, CallOutcome::Beendet]
        );
        let verbunden = bus
            .events
            .lock()
            .iter()
            .filter(|e| matches!(e, ParleyEvent::AnrufVerbunden { .. }))
            .count();
        assert_eq!(verbunden, 1);
        assert!(matches!(
            bus.events.lock().last(),
            Some(ParleyEvent::ZustandAktualisiert {
                verbindungen: 2,
                online_peers: 2,
                aktive_anrufe: 0
            })
        ));
    }
}
