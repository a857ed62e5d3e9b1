//! Postgres-backed ticket store
//!
//! One row per ticket, messages in `ticket_messages` with a per-ticket
//! `seq` column so read-back order is exactly append order. Appends and
//! status transitions run inside a per-ticket critical section plus a
//! row-level `FOR UPDATE` transaction: all-or-nothing, no partially
//! written message visible to readers.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

use super::{
    locks::TicketLocks, validate_content, validate_subject, Ticket, TicketFilter, TicketMessage,
    TicketStatus, TicketStore, TicketWithMessages,
};

pub struct PgTicketStore {
    pool: PgPool,
    append_locks: TicketLocks,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            append_locks: TicketLocks::new(),
        }
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct TicketRow {
    id: Uuid,
    subject: String,
    created_by: Uuid,
    status: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    closed_at: Option<OffsetDateTime>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = ApiError;

    fn try_from(row: TicketRow) -> Result<Self, ApiError> {
        Ok(Ticket {
            id: row.id,
            subject: row.subject,
            created_by: row.created_by,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            closed_at: row.closed_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    ticket_id: Uuid,
    sender_id: Uuid,
    seq: i64,
    content: String,
    created_at: OffsetDateTime,
}

impl From<MessageRow> for TicketMessage {
    fn from(row: MessageRow) -> Self {
        TicketMessage {
            id: row.id,
            ticket_id: row.ticket_id,
            sender_id: row.sender_id,
            seq: row.seq,
            content: row.content,
            created_at: row.created_at,
        }
    }
}

const TICKET_COLUMNS: &str =
    "id, subject, created_by, status::text AS status, created_at, updated_at, closed_at";

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn create_ticket(
        &self,
        created_by: Uuid,
        subject: &str,
        first_message: &str,
    ) -> ApiResult<TicketWithMessages> {
        validate_subject(subject)?;
        validate_content(first_message)?;

        let mut tx = self.pool.begin().await?;

        let ticket: TicketRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO tickets (subject, created_by)
            VALUES ($1, $2)
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(subject)
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await?;

        let seed: MessageRow = sqlx::query_as(
            r#"
            INSERT INTO ticket_messages (ticket_id, sender_id, seq, content)
            VALUES ($1, $2, 1, $3)
            RETURNING id, ticket_id, sender_id, seq, content, created_at
            "#,
        )
        .bind(ticket.id)
        .bind(created_by)
        .bind(first_message)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            ticket_id = %ticket.id,
            created_by = %created_by,
            "Support ticket created"
        );

        Ok(TicketWithMessages {
            ticket: ticket.try_into()?,
            messages: vec![seed.into()],
        })
    }

    async fn append_message(
        &self,
        ticket_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> ApiResult<TicketMessage> {
        validate_content(content)?;

        // Per-ticket critical section; appends to other tickets proceed
        // in parallel. No registry or router lock is held here.
        let _guard = self.append_locks.acquire(ticket_id).await;

        let mut tx = self.pool.begin().await?;

        let status: Option<String> =
            sqlx::query_scalar("SELECT status::text FROM tickets WHERE id = $1 FOR UPDATE")
                .bind(ticket_id)
                .fetch_optional(&mut *tx)
                .await?;

        let status: TicketStatus = status.ok_or(ApiError::NotFound)?.parse()?;
        if status == TicketStatus::Closed {
            return Err(ApiError::TicketClosed);
        }

        let message: MessageRow = sqlx::query_as(
            r#"
            INSERT INTO ticket_messages (ticket_id, sender_id, seq, content)
            SELECT $1, $2, COALESCE(MAX(seq), 0) + 1, $3
            FROM ticket_messages
            WHERE ticket_id = $1
            RETURNING id, ticket_id, sender_id, seq, content, created_at
            "#,
        )
        .bind(ticket_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE tickets SET updated_at = NOW() WHERE id = $1")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(message.into())
    }

    async fn set_status(&self, ticket_id: Uuid, new_status: TicketStatus) -> ApiResult<Ticket> {
        let _guard = self.append_locks.acquire(ticket_id).await;

        let mut tx = self.pool.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status::text FROM tickets WHERE id = $1 FOR UPDATE")
                .bind(ticket_id)
                .fetch_optional(&mut *tx)
                .await?;

        let current: TicketStatus = current.ok_or(ApiError::NotFound)?.parse()?;
        if !current.can_advance_to(new_status) {
            return Err(ApiError::InvalidTransition {
                from: current,
                to: new_status,
            });
        }

        let ticket: TicketRow = sqlx::query_as(&format!(
            r#"
            UPDATE tickets
            SET status = $2::ticket_status,
                updated_at = NOW(),
                closed_at = CASE WHEN $2 = 'closed' THEN NOW() ELSE closed_at END
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket_id)
        .bind(new_status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            ticket_id = %ticket_id,
            from = %current,
            to = %new_status,
            "Ticket status advanced"
        );

        ticket.try_into()
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> ApiResult<TicketWithMessages> {
        let ticket: Option<TicketRow> =
            sqlx::query_as(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"))
                .bind(ticket_id)
                .fetch_optional(&self.pool)
                .await?;
        let ticket = ticket.ok_or(ApiError::NotFound)?;

        let messages: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, ticket_id, sender_id, seq, content, created_at
            FROM ticket_messages
            WHERE ticket_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(TicketWithMessages {
            ticket: ticket.try_into()?,
            messages: messages.into_iter().map(Into::into).collect(),
        })
    }

    async fn list_tickets(&self, filter: TicketFilter) -> ApiResult<Vec<Ticket>> {
        let rows: Vec<TicketRow> = match (filter.created_by, filter.status) {
            (Some(created_by), Some(status)) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {TICKET_COLUMNS} FROM tickets
                    WHERE created_by = $1 AND status = $2::ticket_status
                    ORDER BY created_at DESC
                    "#
                ))
                .bind(created_by)
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            (Some(created_by), None) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {TICKET_COLUMNS} FROM tickets
                    WHERE created_by = $1
                    ORDER BY created_at DESC
                    "#
                ))
                .bind(created_by)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some(status)) => {
                sqlx::query_as(&format!(
                    r#"
                    SELECT {TICKET_COLUMNS} FROM tickets
                    WHERE status = $1::ticket_status
                    ORDER BY created_at DESC
                    "#
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            (None, None) => {
                sqlx::query_as(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn ticket_owner(&self, ticket_id: Uuid) -> ApiResult<Uuid> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT created_by FROM tickets WHERE id = $1")
                .bind(ticket_id)
                .fetch_optional(&self.pool)
                .await?;
        owner.ok_or(ApiError::NotFound)
    }
}
