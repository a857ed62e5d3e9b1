//! WebSocket handler for Axum
//!
//! Upgrades the connection, resolves the presented credential, then runs
//! one task per live connection: a send task draining the session's event
//! channel and a receive loop dispatching client events.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{stream::StreamExt, SinkExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use staffdesk_shared::AuthUser;

use crate::auth::resolve_identity;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

use super::{
    events::{ClientEvent, RoomKey, ServerEvent},
    session::Session,
};

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: String,
}

/// WebSocket handler - upgrades HTTP connection to WebSocket.
/// Authenticates via query parameter token instead of middleware Extension.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WebSocketQuery>,
) -> Result<Response, ApiError> {
    let user = resolve_identity(&params.token, &state.config.jwt_secret)?;

    tracing::info!(identity = %user.identity, role = %user.role, "WebSocket upgrade requested");

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user, state)))
}

/// Handle one live connection
async fn handle_socket(socket: WebSocket, user: AuthUser, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel the room router pushes into; drained by the send task.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let session = state.registry.admit(user.identity, user.role, tx).await;
    let session_id = session.session_id;

    let _ = session.send(ServerEvent::Connected { session_id });

    // Drain outbound events to the transport.
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to serialize server event");
                }
            }
        }
    });

    // Inbound loop; suspends only while waiting for transport data.
    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => handle_client_event(event, &session, &state).await,
                Err(e) => {
                    tracing::warn!(error = ?e, "Failed to parse client event");
                    let _ = session.send(ServerEvent::Error {
                        code: "VALIDATION_ERROR".to_string(),
                        message: "Invalid event format".to_string(),
                    });
                }
            },
            Message::Close(_) => {
                tracing::info!(session_id = %session_id, "WebSocket close frame received");
                break;
            }
            // Axum answers transport pings automatically
            Message::Ping(_) | Message::Pong(_) => {}
            _ => {} // Ignore binary frames
        }
    }

    // Cleanup on disconnect; safe against publishes still in flight.
    tracing::info!(session_id = %session_id, identity = %user.identity, "WebSocket connection closing");
    state.registry.drop_session(&session_id).await;
    send_task.abort();
}

/// Dispatch one client event. Errors are terminal for the request and
/// reported only to this session.
async fn handle_client_event(event: ClientEvent, session: &Arc<Session>, state: &AppState) {
    match event {
        ClientEvent::Join { room } => {
            let result = match authorize_join(state, session, room).await {
                Ok(()) => state.registry.subscribe(session, room).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(()) => {
                    let _ = session.send(ServerEvent::Joined { room });
                }
                Err(err) => {
                    let _ = session.send(ServerEvent::from_error(&err));
                }
            }
        }

        ClientEvent::Leave { room } => {
            state.registry.unsubscribe(session, room).await;
        }

        ClientEvent::Send { ticket_id, content } => {
            if let Err(err) = state.ingest.submit(session, ticket_id, &content).await {
                let _ = session.send(ServerEvent::from_error(&err));
            }
        }

        ClientEvent::SetStatus { ticket_id, status } => {
            let actor = AuthUser::new(session.identity, session.role);
            if let Err(err) = state.lifecycle.set_status(actor, ticket_id, status).await {
                let _ = session.send(ServerEvent::from_error(&err));
            }
        }

        ClientEvent::Ping => {
            let _ = session.send(ServerEvent::Pong);
        }
    }
}

/// Room authorization: employees may join only rooms for tickets they
/// created; admins may join any ticket room and the admins room.
async fn authorize_join(state: &AppState, session: &Session, room: RoomKey) -> ApiResult<()> {
    match room {
        RoomKey::Admins => {
            if session.role.is_admin() {
                Ok(())
            } else {
                Err(ApiError::Forbidden)
            }
        }
        RoomKey::Ticket(ticket_id) => {
            if session.role.is_admin() {
                return Ok(());
            }
            let owner = state.store.ticket_owner(ticket_id).await?;
            if owner == session.identity {
                Ok(())
            } else {
                Err(ApiError::Forbidden)
            }
        }
    }
}
