//! Ticket store adapter
//!
//! The single component touching durable storage. Tickets are created,
//! appended to and transitioned exclusively through the [`TicketStore`]
//! trait; the websocket layer never issues a query of its own.

pub mod locks;
pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Maximum ticket subject length accepted on creation
pub const MAX_SUBJECT_LENGTH: usize = 500;
/// Maximum message content length
pub const MAX_CONTENT_LENGTH: usize = 50_000;

/// Ticket status state machine: open -> in_progress -> closed.
///
/// Variant order is the transition order; `can_advance_to` relies on it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Closed => "closed",
        }
    }

    /// Forward-only: skipping ahead (open -> closed) is allowed, any
    /// backwards or same-state move is not. Closed is terminal.
    pub fn can_advance_to(self, next: TicketStatus) -> bool {
        next > self
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(ApiError::Database(format!("unknown ticket status: {other}"))),
        }
    }
}

/// A support ticket. The message log lives in [`TicketWithMessages`];
/// list endpoints return the bare ticket.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub id: Uuid,
    pub subject: String,
    pub created_by: Uuid,
    pub status: TicketStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub closed_at: Option<OffsetDateTime>,
}

/// One entry in a ticket's append-only message log.
///
/// `seq` is the authoritative order within the ticket; `created_at` is
/// assigned at persistence time and may tie under rapid appends.
#[derive(Debug, Clone, Serialize)]
pub struct TicketMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender_id: Uuid,
    pub seq: i64,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A ticket with its full ordered message history, used to backfill
/// client state on (re)connect.
#[derive(Debug, Clone, Serialize)]
pub struct TicketWithMessages {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub messages: Vec<TicketMessage>,
}

/// Read-path filter. `created_by` restricts to an employee's own tickets;
/// admin callers leave it unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketFilter {
    pub created_by: Option<Uuid>,
    pub status: Option<TicketStatus>,
}

/// The single source of truth for tickets and their message logs.
///
/// Implementations must make appends atomic and serialized per ticket so
/// the log order is a valid serialization of concurrent sends.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Create a ticket with `status = open` and a single seed message
    /// from the raising employee.
    async fn create_ticket(
        &self,
        created_by: Uuid,
        subject: &str,
        first_message: &str,
    ) -> ApiResult<TicketWithMessages>;

    /// Append a message to a ticket's log. Closed tickets accept no
    /// further messages through this path.
    async fn append_message(
        &self,
        ticket_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> ApiResult<TicketMessage>;

    /// Advance the ticket status. Transition legality is enforced here;
    /// actor authorization belongs to the lifecycle controller.
    async fn set_status(&self, ticket_id: Uuid, new_status: TicketStatus) -> ApiResult<Ticket>;

    async fn get_ticket(&self, ticket_id: Uuid) -> ApiResult<TicketWithMessages>;

    async fn list_tickets(&self, filter: TicketFilter) -> ApiResult<Vec<Ticket>>;

    /// Owner lookup backing the room join authorization check.
    async fn ticket_owner(&self, ticket_id: Uuid) -> ApiResult<Uuid>;
}

/// Validate a ticket subject on creation
pub(crate) fn validate_subject(subject: &str) -> ApiResult<()> {
    if subject.trim().is_empty() {
        return Err(ApiError::Validation("Subject cannot be empty".into()));
    }
    if subject.len() > MAX_SUBJECT_LENGTH {
        return Err(ApiError::Validation(format!(
            "Subject too long (max {MAX_SUBJECT_LENGTH} characters)"
        )));
    }
    Ok(())
}

/// Validate message content before it reaches the log
pub(crate) fn validate_content(content: &str) -> ApiResult<()> {
    if content.trim().is_empty() {
        return Err(ApiError::Validation("Message content cannot be empty".into()));
    }
    if content.len() > MAX_CONTENT_LENGTH {
        return Err(ApiError::Validation(format!(
            "Message too long (max {MAX_CONTENT_LENGTH} characters)"
        )));
    }
    Ok(())
}
