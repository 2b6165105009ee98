//! Wire-Format fuer WebSocket-Verbindungen
//!
//! Jede Nachricht ist genau ein WebSocket-Text-Frame mit einem JSON-Objekt.
//! Die maximale Nachrichtengroesse ist konfigurierbar (Standard: 1 MB) und
//! wird beim Dekodieren und Kodieren geprueft.
//!
//! ```text
//! {"event": "call-request", "data": {"to": "bob", "from": "alice", "offer": {...}}}
//! ```

use parley_core::{ParleyError, Result};

use crate::control::{ClientMessage, ServerMessage};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Nachrichtengroesse (1 MB)
pub const DEFAULT_MAX_NACHRICHT_BYTES: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// JSON-Codec fuer Signaling-Nachrichten
///
/// Dekodiert Client-Nachrichten (inklusive Feldvalidierung) und kodiert
/// Server-Nachrichten.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    /// Maximale erlaubte Nachrichtengroesse in Bytes
    max_nachricht_bytes: usize,
}

impl JsonCodec {
    /// Erstellt einen neuen `JsonCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_nachricht_bytes: DEFAULT_MAX_NACHRICHT_BYTES,
        }
    }

    /// Erstellt einen `JsonCodec` mit benutzerdefinierter maximaler Groesse
    pub fn with_max_size(max_nachricht_bytes: usize) -> Self {
        Self {
            max_nachricht_bytes,
        }
    }

    /// Dekodiert einen Text-Frame in eine Client-Nachricht
    ///
    /// # Fehler
    /// - `NachrichtZuGross` wenn der Frame das Limit ueberschreitet
    /// - `UngueltigeNachricht` bei ungueltigem JSON, unbekanntem Event,
    ///   fehlenden Feldern oder leeren Peer-Kennungen
    pub fn decode(&self, text: &str) -> Result<ClientMessage> {
        self.groesse_pruefen(text.len())?;

        let nachricht: ClientMessage = serde_json::from_str(text).map_err(|e| {
            ParleyError::ungueltig(format!("JSON-Deserialisierung fehlgeschlagen: {e}"))
        })?;

        nachricht.validieren().map_err(ParleyError::UngueltigeNachricht)?;
        Ok(nachricht)
    }

    /// Kodiert eine Server-Nachricht als Text-Frame
    pub fn encode(&self, nachricht: &ServerMessage) -> Result<String> {
        let json = serde_json::to_string(nachricht).map_err(|e| {
            ParleyError::intern(format!("JSON-Serialisierung fehlgeschlagen: {e}"))
        })?;
        self.groesse_pruefen(json.len())?;
        Ok(json)
    }

    fn groesse_pruefen(&self, groesse: usize) -> Result<()> {
        if groesse > self.max_nachricht_bytes {
            return Err(ParleyError::NachrichtZuGross {
                groesse,
                maximum: self.max_nachricht_bytes,
            });
        }
        Ok(())
    }
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::PeerId;

    #[test]
    fn decode_gueltige_nachricht() {
        let codec = JsonCodec::new();
        let msg = codec
            .decode(r#"{"event":"register","data":{"peerId":"alice"}}"#)
            .unwrap();
        assert_eq!(msg.event_name(), "register");
    }

    #[test]
    fn decode_ungueltiges_json() {
        let codec = JsonCodec::new();
        let fehler = codec.decode("{kein json").unwrap_err();
        assert!(matches!(fehler, ParleyError::UngueltigeNachricht(_)));
    }

    #[test]
    fn decode_leere_kennung() {
        let codec = JsonCodec::new();
        let fehler = codec
            .decode(r#"{"event":"register","data":{"peerId":""}}"#)
            .unwrap_err();
        assert!(matches!(fehler, ParleyError::UngueltigeNachricht(_)));
    }

    #[test]
    fn decode_zu_gross() {
        let codec = JsonCodec::with_max_size(16);
        let fehler = codec
            .decode(r#"{"event":"register","data":{"peerId":"alice"}}"#)
            .unwrap_err();
        assert!(matches!(fehler, ParleyError::NachrichtZuGross { maximum: 16, .. }));
    }

    #[test]
    fn encode_server_nachricht() {
        let codec = JsonCodec::new();
        let text = codec
            .encode(&ServerMessage::user_busy(PeerId::new("bob")))
            .unwrap();
        assert_eq!(text, r#"{"event":"user-busy","data":{"peerId":"bob"}}"#);
    }

    #[test]
    fn encode_zu_gross() {
        let codec = JsonCodec::with_max_size(8);
        assert!(codec.encode(&ServerMessage::call_ended()).is_err());
    }
}
