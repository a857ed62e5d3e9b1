//! WebSocket event types and serialization
//!
//! Defines all client-to-server and server-to-client event types
//! with type-safe serde serialization, plus the structured room key.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Ticket, TicketMessage, TicketStatus};

// =============================================================================
// Room Keys
// =============================================================================

/// A logical fan-out group: one ticket's participants, or the broadcast
/// set of all connected admins (used to announce new employee tickets).
///
/// Wire form is `ticket:<uuid>` / `admins`; invalid keys fail at parse
/// time rather than silently creating an empty room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Ticket(Uuid),
    Admins,
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomKey::Ticket(id) => write!(f, "ticket:{id}"),
            RoomKey::Admins => f.write_str("admins"),
        }
    }
}

impl std::str::FromStr for RoomKey {
    type Err = ParseRoomKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "admins" {
            return Ok(RoomKey::Admins);
        }
        if let Some(id) = s.strip_prefix("ticket:") {
            let id = id.parse().map_err(|_| ParseRoomKeyError(s.to_string()))?;
            return Ok(RoomKey::Ticket(id));
        }
        Err(ParseRoomKeyError(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid room key: {0}")]
pub struct ParseRoomKeyError(pub String);

impl Serialize for RoomKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoomKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Subscribe to a room (authorization checked server-side)
    Join { room: RoomKey },

    /// Unsubscribe from a room; no-op if not subscribed
    Leave { room: RoomKey },

    /// Submit a message to a ticket room
    Send { ticket_id: Uuid, content: String },

    /// Advance a ticket's status (admin only)
    SetStatus {
        ticket_id: Uuid,
        status: TicketStatus,
    },

    /// Heartbeat ping to keep the connection alive
    Ping,
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events pushed to subscribed sessions
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Connection admitted
    Connected { session_id: Uuid },

    /// Join acknowledged; events published after this point are delivered
    Joined { room: RoomKey },

    /// Newly persisted message (server-assigned id and timestamp)
    Message {
        ticket_id: Uuid,
        message: TicketMessage,
    },

    /// Ticket status advanced
    StatusChanged {
        ticket_id: Uuid,
        status: TicketStatus,
    },

    /// New employee ticket, pushed to the admins room
    TicketCreated { ticket: Ticket },

    /// Heartbeat response
    Pong,

    /// Request-scoped error, reported only to the originating session
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn from_error(err: &crate::error::ApiError) -> Self {
        ServerEvent::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
