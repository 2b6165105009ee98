//! Test-Hilfen: aufzeichnende Connection-Handles

use parking_lot::Mutex;
use parley_core::ConnectionId;
use parley_protocol::ServerMessage;
use std::sync::Arc;

use crate::handle::ConnectionHandle;

/// Handle das alle gesendeten Nachrichten aufzeichnet
#[derive(Clone, Default)]
pub struct TestHandle {
    id: ConnectionId,
    postfach: Arc<Mutex<Vec<ServerMessage>>>,
}

impl TestHandle {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Entnimmt alle bisher empfangenen Nachrichten
    pub fn abholen(&self) -> Vec<ServerMessage> {
        std::mem::take(&mut *self.postfach.lock())
    }

    /// Entnimmt alle Nachrichten ausser `users-online`
    pub fn abholen_ohne_presence(&self) -> Vec<ServerMessage> {
        self.abholen()
            .into_iter()
            .filter(|m| !matches!(m, ServerMessage::UsersOnline(_)))
            .collect()
    }

    /// Letzte empfangene `users-online`-Liste
    pub fn letzte_presence(&self) -> Option<Vec<String>> {
        self.postfach.lock().iter().rev().find_map(|m| match m {
            ServerMessage::UsersOnline(peers) => {
                Some(peers.iter().map(|p| p.to_string()).collect())
            }
            _ => None,
        })
    }
}

impl ConnectionHandle for TestHandle {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn senden(&self, nachricht: ServerMessage) -> bool {
        self.postfach.lock().push(nachricht);
        true
    }
}
