//! Per-ticket append serialization
//!
//! Concurrent sends to the same ticket are processed one at a time so the
//! append-order invariant holds; sends to different tickets proceed fully
//! in parallel. This is a keyed critical section, not a global lock.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Keyed async mutex map, one entry per ticket seen so far.
#[derive(Default)]
pub struct TicketLocks {
    inner: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl TicketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the critical section for one ticket. The guard is owned so
    /// it can be held across the adapter's persistence await points.
    pub async fn acquire(&self, ticket_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            Arc::clone(map.entry(ticket_id).or_default())
        };
        lock.lock_owned().await
    }
}
