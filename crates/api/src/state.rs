//! Shared application state
//!
//! The session registry and room router are constructed once here and
//! passed by reference to every component that admits connections or
//! publishes events; there is no ambient global channel server.

use std::sync::Arc;

use crate::config::Config;
use crate::lifecycle::TicketLifecycle;
use crate::store::TicketStore;
use crate::websocket::ingest::MessageIngest;
use crate::websocket::registry::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TicketStore>,
    pub registry: SessionRegistry,
    pub ingest: MessageIngest,
    pub lifecycle: TicketLifecycle,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn TicketStore>) -> Self {
        let registry = SessionRegistry::new();
        let rooms = registry.router();

        Self {
            config: Arc::new(config),
            ingest: MessageIngest::new(Arc::clone(&store), Arc::clone(&rooms)),
            lifecycle: TicketLifecycle::new(Arc::clone(&store), rooms),
            store,
            registry,
        }
    }
}
