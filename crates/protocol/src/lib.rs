//! parley-protocol – Signaling-Protokoll-Definitionen
//!
//! Dieses Crate definiert alle Nachrichten die zwischen Browser-Client und
//! Signaling-Server ausgetauscht werden, sowie deren JSON-Wire-Format.

pub mod control;
pub mod wire;

pub use control::{ClientMessage, FailureReason, ServerMessage};
pub use wire::JsonCodec;
