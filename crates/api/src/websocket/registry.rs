//! Session registry
//!
//! Tracks each live connection, the identity and role bound to it, and
//! which rooms it has joined. Purely in-memory; rebuilt on every connect
//! and never touching durable storage. Passed explicitly to every
//! component that admits connections or publishes events — no ambient
//! global.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use staffdesk_shared::Role;

use crate::error::{ApiError, ApiResult};

use super::events::{RoomKey, ServerEvent};
use super::room::RoomRouter;
use super::session::Session;

/// Registry of live sessions, shared across all connection tasks
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
    rooms: Arc<RoomRouter>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RoomRouter::new()),
        }
    }

    /// The room router fed by this registry's sessions
    pub fn router(&self) -> Arc<RoomRouter> {
        Arc::clone(&self.rooms)
    }

    /// Admit a connection, binding identity and role for its lifetime
    pub async fn admit(
        &self,
        identity: Uuid,
        role: Role,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Arc<Session> {
        let session = Arc::new(Session::new(identity, role, sender));
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id, Arc::clone(&session));

        tracing::info!(
            session_id = %session.session_id,
            identity = %identity,
            role = %role,
            total_sessions = sessions.len(),
            "Session admitted"
        );

        session
    }

    /// Drop a session and all its room subscriptions; idempotent.
    ///
    /// After this returns the session appears in no room, so an in-flight
    /// publish can at worst hit its already-closed channel (a discard).
    pub async fn drop_session(&self, session_id: &Uuid) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.remove(session_id) {
            self.rooms.remove_session(session_id).await;

            tracing::info!(
                session_id = %session_id,
                identity = %session.identity,
                remaining_sessions = sessions.len(),
                "Session dropped"
            );
        }
    }

    pub async fn get(&self, session_id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Record a room subscription.
    ///
    /// Role-based rules are enforced here (the `admins` room is admin
    /// only); ticket ownership is resolved by the caller against the
    /// ticket store, since this registry never reads tickets.
    pub async fn subscribe(&self, session: &Arc<Session>, room: RoomKey) -> ApiResult<()> {
        if matches!(room, RoomKey::Admins) && !session.role.is_admin() {
            return Err(ApiError::Forbidden);
        }

        session.subscriptions.write().await.insert(room);
        self.rooms.join(room, Arc::clone(session)).await;

        tracing::debug!(
            session_id = %session.session_id,
            room = %room,
            "Subscribed to room"
        );
        Ok(())
    }

    /// Remove a room subscription; no-op if absent
    pub async fn unsubscribe(&self, session: &Arc<Session>, room: RoomKey) {
        session.subscriptions.write().await.remove(&room);
        self.rooms.leave(&room, &session.session_id).await;

        tracing::debug!(
            session_id = %session.session_id,
            room = %room,
            "Unsubscribed from room"
        );
    }

    /// Sessions currently subscribed to a room
    pub async fn sessions_for(&self, room: &RoomKey) -> Vec<Arc<Session>> {
        self.rooms.sessions_for(room).await
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
