//! Message ingest pipeline
//!
//! Validate, persist, then fan out. The persist-then-publish ordering is
//! the core correctness guarantee: a message is never visible to any
//! participant before it is durable, and the broadcast always carries the
//! persisted record with its server-assigned id and timestamp, never the
//! client-proposed shape.

use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::store::locks::TicketLocks;
use crate::store::{TicketMessage, TicketStore};

use super::events::{RoomKey, ServerEvent};
use super::room::RoomRouter;
use super::session::Session;

#[derive(Clone)]
pub struct MessageIngest {
    store: Arc<dyn TicketStore>,
    rooms: Arc<RoomRouter>,
    // Spans persist AND fan-out, so subscribers observe messages in
    // exactly the persisted order. The adapter's own serialization only
    // covers the append itself.
    order: Arc<TicketLocks>,
}

impl MessageIngest {
    pub fn new(store: Arc<dyn TicketStore>, rooms: Arc<RoomRouter>) -> Self {
        Self {
            store,
            rooms,
            order: Arc::new(TicketLocks::new()),
        }
    }

    /// Process one inbound send request.
    ///
    /// Failures are terminal for this request and reported only to the
    /// originating session; nothing is published on a failed persist.
    pub async fn submit(
        &self,
        session: &Session,
        ticket_id: Uuid,
        content: &str,
    ) -> ApiResult<TicketMessage> {
        let room = RoomKey::Ticket(ticket_id);

        // Validate before any storage call.
        if content.trim().is_empty() {
            return Err(ApiError::Validation("Message content cannot be empty".into()));
        }
        if !session.is_subscribed(&room).await {
            return Err(ApiError::Forbidden);
        }

        // Per-ticket critical section over persist + publish; sends to
        // other tickets proceed in parallel.
        let _guard = self.order.acquire(ticket_id).await;

        // Persist. The adapter additionally serializes appends itself.
        let message = self.store.append_message(ticket_id, session.identity, content).await?;

        // Fan out the canonical record, sender's sessions included.
        self.rooms
            .publish(
                &room,
                ServerEvent::Message {
                    ticket_id,
                    message: message.clone(),
                },
            )
            .await;

        tracing::info!(
            ticket_id = %ticket_id,
            sender = %session.identity,
            seq = message.seq,
            "Message persisted and broadcast"
        );

        Ok(message)
    }
}
