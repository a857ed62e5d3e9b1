//! Ticket lifecycle controller
//!
//! Owns the status state machine (open -> in_progress -> closed) and the
//! authorization rule for who may transition a ticket. Every successful
//! transition is pushed to the ticket's room so subscribed sessions
//! update live without re-fetching.

use std::sync::Arc;
use uuid::Uuid;

use staffdesk_shared::AuthUser;

use crate::error::{ApiError, ApiResult};
use crate::store::{Ticket, TicketStatus, TicketStore};
use crate::websocket::events::{RoomKey, ServerEvent};
use crate::websocket::room::RoomRouter;

#[derive(Clone)]
pub struct TicketLifecycle {
    store: Arc<dyn TicketStore>,
    rooms: Arc<RoomRouter>,
}

impl TicketLifecycle {
    pub fn new(store: Arc<dyn TicketStore>, rooms: Arc<RoomRouter>) -> Self {
        Self { store, rooms }
    }

    /// Advance a ticket's status. Admin only; transition legality is
    /// enforced by the store adapter under the per-ticket lock.
    pub async fn set_status(
        &self,
        actor: AuthUser,
        ticket_id: Uuid,
        new_status: TicketStatus,
    ) -> ApiResult<Ticket> {
        if !actor.role.is_admin() {
            return Err(ApiError::Forbidden);
        }

        let ticket = self.store.set_status(ticket_id, new_status).await?;

        self.rooms
            .publish(
                &RoomKey::Ticket(ticket_id),
                ServerEvent::StatusChanged {
                    ticket_id,
                    status: ticket.status,
                },
            )
            .await;

        tracing::info!(
            ticket_id = %ticket_id,
            actor = %actor.identity,
            status = %ticket.status,
            "Ticket status changed"
        );

        Ok(ticket)
    }
}
