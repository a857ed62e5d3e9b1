//! Support ticket routes
//!
//! Request/response paths used by the UI to create tickets and backfill
//! state on (re)connect; live updates flow over the websocket channel.

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use staffdesk_shared::AuthUser;

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
    store::{Ticket, TicketFilter, TicketStatus, TicketWithMessages},
    websocket::events::{RoomKey, ServerEvent},
};

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    /// The initial message content
    #[serde(alias = "description")]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct TicketsListResponse {
    pub tickets: Vec<Ticket>,
}

/// Create a new support ticket with its seed message, then notify every
/// connected admin session.
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateTicketRequest>,
) -> ApiResult<Json<TicketWithMessages>> {
    let created = state
        .store
        .create_ticket(user.identity, &req.subject, &req.content)
        .await?;

    state
        .registry
        .router()
        .publish(
            &RoomKey::Admins,
            ServerEvent::TicketCreated {
                ticket: created.ticket.clone(),
            },
        )
        .await;

    tracing::info!(
        ticket_id = %created.ticket.id,
        created_by = %user.identity,
        "Support ticket opened"
    );

    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<TicketStatus>,
}

/// List tickets: an employee sees their own, an admin sees all
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListTicketsQuery>,
) -> ApiResult<Json<TicketsListResponse>> {
    let filter = TicketFilter {
        created_by: if user.role.is_admin() {
            None
        } else {
            Some(user.identity)
        },
        status: query.status,
    };

    let tickets = state.store.list_tickets(filter).await?;
    Ok(Json(TicketsListResponse { tickets }))
}

/// Get a single ticket with its full ordered message history
pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ticket_id): Path<Uuid>,
) -> ApiResult<Json<TicketWithMessages>> {
    let ticket = state.store.get_ticket(ticket_id).await?;

    // Scope visibility without leaking existence to non-owners.
    if !user.role.is_admin() && ticket.ticket.created_by != user.identity {
        return Err(ApiError::NotFound);
    }

    Ok(Json(ticket))
}
