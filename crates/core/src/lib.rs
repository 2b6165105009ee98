//! parley-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Parley-Crates gemeinsam genutzt werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{ParleyError, Result};
pub use event::{CallOutcome, ParleyEvent};
pub use types::{ConnectionId, PeerId, SessionId};
