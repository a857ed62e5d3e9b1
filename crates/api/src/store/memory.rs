//! In-memory ticket store used by the pipeline and concurrency tests.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

use super::{
    validate_content, validate_subject, Ticket, TicketFilter, TicketMessage, TicketStatus,
    TicketStore, TicketWithMessages,
};

#[derive(Default)]
pub struct MemTicketStore {
    tickets: RwLock<HashMap<Uuid, TicketWithMessages>>,
}

impl MemTicketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Appends take the single write lock, which is a stricter serialization
// than the per-ticket sections the Postgres adapter uses; the observable
// ordering guarantees are the same.
#[async_trait]
impl TicketStore for MemTicketStore {
    async fn create_ticket(
        &self,
        created_by: Uuid,
        subject: &str,
        first_message: &str,
    ) -> ApiResult<TicketWithMessages> {
        validate_subject(subject)?;
        validate_content(first_message)?;

        let now = OffsetDateTime::now_utc();
        let ticket_id = Uuid::new_v4();
        let entry = TicketWithMessages {
            ticket: Ticket {
                id: ticket_id,
                subject: subject.to_string(),
                created_by,
                status: TicketStatus::Open,
                created_at: now,
                updated_at: now,
                closed_at: None,
            },
            messages: vec![TicketMessage {
                id: Uuid::new_v4(),
                ticket_id,
                sender_id: created_by,
                seq: 1,
                content: first_message.to_string(),
                created_at: now,
            }],
        };

        self.tickets.write().await.insert(ticket_id, entry.clone());
        Ok(entry)
    }

    async fn append_message(
        &self,
        ticket_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> ApiResult<TicketMessage> {
        validate_content(content)?;

        let mut tickets = self.tickets.write().await;
        let entry = tickets.get_mut(&ticket_id).ok_or(ApiError::NotFound)?;
        if entry.ticket.status == TicketStatus::Closed {
            return Err(ApiError::TicketClosed);
        }

        let now = OffsetDateTime::now_utc();
        let message = TicketMessage {
            id: Uuid::new_v4(),
            ticket_id,
            sender_id,
            seq: entry.messages.len() as i64 + 1,
            content: content.to_string(),
            created_at: now,
        };
        entry.messages.push(message.clone());
        entry.ticket.updated_at = now;
        Ok(message)
    }

    async fn set_status(&self, ticket_id: Uuid, new_status: TicketStatus) -> ApiResult<Ticket> {
        let mut tickets = self.tickets.write().await;
        let entry = tickets.get_mut(&ticket_id).ok_or(ApiError::NotFound)?;

        if !entry.ticket.status.can_advance_to(new_status) {
            return Err(ApiError::InvalidTransition {
                from: entry.ticket.status,
                to: new_status,
            });
        }

        let now = OffsetDateTime::now_utc();
        entry.ticket.status = new_status;
        entry.ticket.updated_at = now;
        if new_status == TicketStatus::Closed {
            entry.ticket.closed_at = Some(now);
        }
        Ok(entry.ticket.clone())
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> ApiResult<TicketWithMessages> {
        self.tickets
            .read()
            .await
            .get(&ticket_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn list_tickets(&self, filter: TicketFilter) -> ApiResult<Vec<Ticket>> {
        let tickets = self.tickets.read().await;
        let mut out: Vec<Ticket> = tickets
            .values()
            .map(|entry| entry.ticket.clone())
            .filter(|t| filter.created_by.is_none_or(|id| t.created_by == id))
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn ticket_owner(&self, ticket_id: Uuid) -> ApiResult<Uuid> {
        self.tickets
            .read()
            .await
            .get(&ticket_id)
            .map(|entry| entry.ticket.created_by)
            .ok_or(ApiError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_order_and_closed_rejection() {
        let store = MemTicketStore::new();
        let employee = Uuid::new_v4();

        let created = store
            .create_ticket(employee, "Laptop issue", "Screen flickers")
            .await
            .unwrap();
        let ticket_id = created.ticket.id;

        for i in 0..3 {
            let msg = store
                .append_message(ticket_id, employee, &format!("update {i}"))
                .await
                .unwrap();
            assert_eq!(msg.seq, i + 2);
        }

        store.set_status(ticket_id, TicketStatus::Closed).await.unwrap();
        let before = store.get_ticket(ticket_id).await.unwrap().messages.len();
        let err = store.append_message(ticket_id, employee, "thanks").await.unwrap_err();
        assert!(matches!(err, ApiError::TicketClosed));
        // Rejected append never mutates the log.
        assert_eq!(store.get_ticket(ticket_id).await.unwrap().messages.len(), before);
    }

    #[tokio::test]
    async fn test_illegal_transition_leaves_status_unchanged() {
        let store = MemTicketStore::new();
        let created = store
            .create_ticket(Uuid::new_v4(), "Subject", "First")
            .await
            .unwrap();
        let ticket_id = created.ticket.id;

        store.set_status(ticket_id, TicketStatus::InProgress).await.unwrap();
        let err = store.set_status(ticket_id, TicketStatus::Open).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidTransition { .. }));
        assert_eq!(
            store.get_ticket(ticket_id).await.unwrap().ticket.status,
            TicketStatus::InProgress
        );
    }

    #[tokio::test]
    async fn test_list_filters() {
        let store = MemTicketStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        store.create_ticket(alice, "A", "first").await.unwrap();
        store.create_ticket(bob, "B", "first").await.unwrap();

        let all = store.list_tickets(TicketFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let mine = store
            .list_tickets(TicketFilter {
                created_by: Some(alice),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].created_by, alice);
    }
}
