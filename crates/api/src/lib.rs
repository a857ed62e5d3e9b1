//! Staffdesk API Library
//!
//! The support-ticket real-time messaging core: session registry, room
//! router, ticket store adapter, message ingest pipeline and the ticket
//! lifecycle controller, plus the REST backfill routes around them.

pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod routes;
pub mod state;
pub mod store;
pub mod websocket;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
