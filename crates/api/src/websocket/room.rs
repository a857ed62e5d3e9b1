//! Room router
//!
//! Maps room keys to the set of live sessions subscribed to them and
//! performs fan-out of outbound events. Never persists anything; delivery
//! is fire-and-forget per transport, so one unreachable connection cannot
//! block or fail delivery to the others.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::events::{RoomKey, ServerEvent};
use super::session::Session;

/// Fan-out router over live room membership
#[derive(Default)]
pub struct RoomRouter {
    rooms: RwLock<HashMap<RoomKey, Vec<Arc<Session>>>>,
}

impl RoomRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to a room
    pub async fn join(&self, room: RoomKey, session: Arc<Session>) {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room).or_default();
        if !members.iter().any(|s| s.session_id == session.session_id) {
            members.push(Arc::clone(&session));
        }

        tracing::debug!(
            room = %room,
            session_id = %session.session_id,
            room_size = members.len(),
            "Session joined room"
        );
    }

    /// Remove a session from a room; no-op if absent
    pub async fn leave(&self, room: &RoomKey, session_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(room) {
            members.retain(|s| s.session_id != *session_id);

            // Clean up empty rooms
            if members.is_empty() {
                rooms.remove(room);
                tracing::debug!(room = %room, "Removed empty room");
            }
        }
    }

    /// Deliver an event to every session currently in the room.
    ///
    /// Membership is snapshotted under the read lock; sends are synchronous
    /// channel pushes, so the lock is never held across a suspension point.
    /// A send to a just-dropped session is silently discarded.
    pub async fn publish(&self, room: &RoomKey, event: ServerEvent) {
        let rooms = self.rooms.read().await;
        if let Some(members) = rooms.get(room) {
            let mut delivered = 0;
            let mut discarded = 0;

            for session in members {
                match session.send(event.clone()) {
                    Ok(()) => delivered += 1,
                    Err(_) => {
                        discarded += 1;
                        tracing::warn!(
                            session_id = %session.session_id,
                            "Failed to push event to session (likely closed)"
                        );
                    }
                }
            }

            tracing::debug!(
                room = %room,
                recipients = delivered,
                discarded = discarded,
                "Published event to room"
            );
        } else {
            tracing::debug!(room = %room, "Publish to room with no subscribers");
        }
    }

    /// Remove a session from every room it is in
    pub async fn remove_session(&self, session_id: &Uuid) {
        let mut rooms = self.rooms.write().await;
        for members in rooms.values_mut() {
            members.retain(|s| s.session_id != *session_id);
        }
        rooms.retain(|_, members| !members.is_empty());
    }

    /// Sessions currently subscribed to a room
    pub async fn sessions_for(&self, room: &RoomKey) -> Vec<Arc<Session>> {
        let rooms = self.rooms.read().await;
        rooms.get(room).cloned().unwrap_or_default()
    }

    pub async fn room_size(&self, room: &RoomKey) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room).map(|members| members.len()).unwrap_or(0)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
