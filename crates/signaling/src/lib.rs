//! parley-signaling – WebSocket Signaling- und Call-Session-Service
//!
//! Dieser Crate implementiert den Koordinator fuer Peer-to-Peer-Sprachanrufe.
//! Er verwaltet WebSocket-Verbindungen, die Presence der registrierten
//! Kennungen und den Zustand aller Zwei-Parteien-Sessions. SDP-Offers,
//! Answers und ICE-Kandidaten werden unveraendert zwischen den Peers
//! weitergeleitet; Medien laufen nie ueber den Server.
//!
//! ## Architektur
//!
//! ```text
//! axum Router (/ws, signaling_router)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  dekodiert Frames, schreibt die Send-Queue in den Socket
//!     |
//!     v  CoreHandle (mpsc)
//! SignalingCore (ein Task, besitzt den gesamten Zustand)
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- PresenceHandler (Register, Disconnect)
//!     +-- CallHandler     (Request, Answer, Reject, End, Klingel-Timeout)
//!     +-- IceHandler      (ICE-Kandidaten)
//!
//! PeerRegistry       – Wer ist unter welcher Kennung erreichbar
//! CallSessionManager – Klingelnde und verbundene Sessions, Besetzt-Status
//! relay              – Zustellung an Peers ueber ihre ClientSender
//! ```

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod event_loop;
pub mod handle;
pub mod handlers;
pub mod registry;
pub mod relay;
pub mod server_state;
pub mod session;
pub mod ws;

#[cfg(test)]
mod testing;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use event_loop::{CoreHandle, SignalingCore};
pub use handle::{ClientSender, ConnectionHandle};
pub use registry::PeerRegistry;
pub use server_state::{SignalingConfig, SignalingState};
pub use session::{CallSession, CallSessionManager, CallState};
pub use ws::{signaling_router, WsState};
