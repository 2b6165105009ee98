//! Fehlertypen fuer den Signaling-Service

use parley_core::PeerId;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// Die Signaling-Event-Loop laeuft nicht mehr
    #[error("Signaling-Kern beendet")]
    KernBeendet,

    /// Ziel ist bereits in einer Session
    #[error("Peer ist besetzt: {0}")]
    Besetzt(PeerId),

    /// Anrufer ist bereits in einer Session
    #[error("Anrufer ist bereits in einem Gespraech: {0}")]
    BereitsImGespraech(PeerId),

    /// Anrufer und Ziel sind identisch
    #[error("Selbstanruf nicht moeglich: {0}")]
    SelbstAnruf(PeerId),

    /// Server ist voll
    #[error("Server ist voll")]
    ServerVoll,
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
