//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::TicketStatus;

/// Application error type
///
/// Every variant is terminal for the single request that caused it and is
/// reported only to the originating session; none of them abort the
/// connection or affect other rooms.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Authentication / authorization
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Insufficient permissions")]
    Forbidden,

    // Validation
    #[error("Validation error: {0}")]
    Validation(String),

    // Resources
    #[error("Ticket not found")]
    NotFound,
    #[error("Ticket is closed and accepts no further messages")]
    TicketClosed,
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: TicketStatus,
        to: TicketStatus,
    },

    // Internal
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Stable machine-readable code, shared between the HTTP body and the
    /// websocket `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "AUTHENTICATION_ERROR",
            ApiError::Forbidden => "AUTHORIZATION_ERROR",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::TicketClosed => "TICKET_CLOSED",
            ApiError::InvalidTransition { .. } => "INVALID_TRANSITION",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::TicketClosed => (StatusCode::CONFLICT, self.to_string()),
            ApiError::InvalidTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Database(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            _ => ApiError::Database(err.to_string()),
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
