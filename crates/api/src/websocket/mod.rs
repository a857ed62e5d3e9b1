//! WebSocket support for real-time ticket messaging
//!
//! Provides the persistent bidirectional channel for support tickets:
//! - **Session**: an admitted connection with identity/role bound once
//! - **Registry**: tracks live sessions and their room subscriptions
//! - **Room**: room-keyed pub/sub for broadcasting events
//! - **Ingest**: validate -> persist -> fan-out pipeline for sends
//! - **Handler**: Axum WebSocket route handler
//! - **Events**: type-safe event definitions for client/server communication

pub mod events;
pub mod handler;
pub mod ingest;
pub mod registry;
pub mod room;
pub mod session;

pub use handler::ws_handler;
pub use registry::SessionRegistry;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use staffdesk_shared::{AuthUser, Role};

    use crate::error::ApiError;
    use crate::store::memory::MemTicketStore;
    use crate::store::{TicketStatus, TicketStore};
    use crate::state::AppState;
    use crate::Config;

    use super::events::{RoomKey, ServerEvent};

    /// Employee raises a ticket, an admin works it to closure, and the
    /// closed ticket rejects further messages without publishing anything.
    #[tokio::test]
    async fn test_ticket_conversation_end_to_end() {
        let store = Arc::new(MemTicketStore::new());
        let state = AppState::new(Config::for_tests(), store.clone());

        let employee_id = Uuid::new_v4();
        let admin_id = Uuid::new_v4();

        // Employee E creates ticket T.
        let created = store
            .create_ticket(employee_id, "Laptop issue", "Screen flickers")
            .await
            .unwrap();
        let ticket_id = created.ticket.id;
        let room = RoomKey::Ticket(ticket_id);
        assert_eq!(created.ticket.status, TicketStatus::Open);
        assert_eq!(created.messages.len(), 1);
        assert_eq!(created.messages[0].content, "Screen flickers");

        // Both sides connect and join the ticket room; the admin also
        // joins the admins broadcast room.
        let (employee_tx, mut employee_rx) = mpsc::unbounded_channel();
        let employee = state.registry.admit(employee_id, Role::Employee, employee_tx).await;
        state.registry.subscribe(&employee, room).await.unwrap();

        let (admin_tx, mut admin_rx) = mpsc::unbounded_channel();
        let admin = state.registry.admit(admin_id, Role::Admin, admin_tx).await;
        state.registry.subscribe(&admin, room).await.unwrap();
        state.registry.subscribe(&admin, RoomKey::Admins).await.unwrap();

        // Admin replies; the employee receives exactly one message event
        // carrying the persisted record.
        state
            .ingest
            .submit(&admin, ticket_id, "Have you tried restarting?")
            .await
            .unwrap();
        match employee_rx.recv().await.unwrap() {
            ServerEvent::Message { message, .. } => {
                assert_eq!(message.content, "Have you tried restarting?");
                assert_eq!(message.sender_id, admin_id);
                assert!(message.created_at >= created.messages[0].created_at);
                assert_eq!(message.seq, 2);
            }
            other => panic!("expected message event, got {other:?}"),
        }
        assert!(employee_rx.try_recv().is_err(), "exactly one event expected");

        // Status moves to in_progress; both sessions hear about it.
        let actor = AuthUser::new(admin_id, Role::Admin);
        state
            .lifecycle
            .set_status(actor, ticket_id, TicketStatus::InProgress)
            .await
            .unwrap();
        for rx in [&mut employee_rx, &mut admin_rx] {
            // The admin's own queue also holds the earlier message event.
            let status = loop {
                match rx.recv().await.unwrap() {
                    ServerEvent::StatusChanged { status, .. } => break status,
                    ServerEvent::Message { .. } => continue,
                    other => panic!("unexpected event {other:?}"),
                }
            };
            assert_eq!(status, TicketStatus::InProgress);
        }

        // Close, then verify the closed ticket accepts no more messages
        // and publishes nothing for the rejected send.
        state
            .lifecycle
            .set_status(actor, ticket_id, TicketStatus::Closed)
            .await
            .unwrap();
        employee_rx.recv().await.unwrap();
        admin_rx.recv().await.unwrap();

        let err = state.ingest.submit(&employee, ticket_id, "thanks").await.unwrap_err();
        assert!(matches!(err, ApiError::TicketClosed));
        assert!(employee_rx.try_recv().is_err());
        assert!(admin_rx.try_recv().is_err());
    }

    /// Dropping a session mid-conversation leaves no stale membership and
    /// never surfaces an error to the remaining recipients.
    #[tokio::test]
    async fn test_drop_during_fanout_is_harmless() {
        let store = Arc::new(MemTicketStore::new());
        let state = AppState::new(Config::for_tests(), store.clone());

        let employee_id = Uuid::new_v4();
        let created = store
            .create_ticket(employee_id, "Subject", "First")
            .await
            .unwrap();
        let room = RoomKey::Ticket(created.ticket.id);

        let (employee_tx, mut employee_rx) = mpsc::unbounded_channel();
        let employee = state.registry.admit(employee_id, Role::Employee, employee_tx).await;
        state.registry.subscribe(&employee, room).await.unwrap();

        let (admin_tx, admin_rx) = mpsc::unbounded_channel();
        let admin = state.registry.admit(Uuid::new_v4(), Role::Admin, admin_tx).await;
        state.registry.subscribe(&admin, room).await.unwrap();

        // Tear down the admin's transport without deregistering first,
        // then publish: the dead channel is discarded silently.
        drop(admin_rx);
        state
            .ingest
            .submit(&employee, created.ticket.id, "anyone there?")
            .await
            .unwrap();
        assert!(matches!(
            employee_rx.recv().await.unwrap(),
            ServerEvent::Message { .. }
        ));

        state.registry.drop_session(&admin.session_id).await;
        assert_eq!(state.registry.sessions_for(&room).await.len(), 1);
    }
}
