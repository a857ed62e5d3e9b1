//! Live connection sessions
//!
//! One session per websocket connection. Identity and role are bound once
//! at admission and never reassigned for the life of the connection.

use std::collections::HashSet;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use staffdesk_shared::Role;

use super::events::{RoomKey, ServerEvent};

/// Represents an admitted websocket connection
#[derive(Debug)]
pub struct Session {
    /// Unique session ID for this connection
    pub session_id: Uuid,

    /// Authenticated identity, immutable after admission
    pub identity: Uuid,

    /// Role derived from the identity at admission
    pub role: Role,

    /// Channel to push events to this connection
    pub sender: mpsc::UnboundedSender<ServerEvent>,

    /// Rooms this session is subscribed to
    pub subscriptions: RwLock<HashSet<RoomKey>>,
}

impl Session {
    pub fn new(identity: Uuid, role: Role, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            identity,
            role,
            sender,
            subscriptions: RwLock::new(HashSet::new()),
        }
    }

    /// Send an event to this connection. Err means the connection is
    /// already closed; callers treat that as a discard, never a failure.
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }

    pub async fn is_subscribed(&self, room: &RoomKey) -> bool {
        self.subscriptions.read().await.contains(room)
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_identity_and_role_bound_at_admission() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let identity = Uuid::new_v4();
        let session = Session::new(identity, Role::Employee, tx);

        assert_eq!(session.identity, identity);
        assert_eq!(session.role, Role::Employee);
        assert!(!session.is_subscribed(&RoomKey::Admins).await);
    }

    #[tokio::test]
    async fn test_send_to_closed_channel_errors() {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(Uuid::new_v4(), Role::Admin, tx);
        drop(rx);
        assert!(session.send(ServerEvent::Pong).is_err());
    }
}
