//! The server's shared connection set and active-client count, guarded by one mutex
//! held only briefly for insertion and removal.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Identifies one accepted connection across the Main Reactor and whichever Worker
/// Reactor ends up owning it. Assigned by the server at accept time, before the
/// connection is handed off, since the worker's own `mio::Token` isn't known until the
/// connection lands in that worker's slab.
pub type ConnectionId = u64;

/// Tracks every currently open connection the server has accepted, and how many are
/// open right now.
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    open: Mutex<HashSet<ConnectionId>>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("active", &self.active_count())
            .finish()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// An empty registry, minting ids starting at 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            open: Mutex::new(HashSet::new()),
        }
    }

    /// Mints the next connection id. Does not insert it; call [`ConnectionRegistry::insert`]
    /// once the connection is actually accepted.
    pub fn next_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Adds `id` to the open set.
    pub fn insert(&self, id: ConnectionId) {
        self.open.lock().unwrap().insert(id);
    }

    /// Removes `id` from the open set. A no-op if it was already removed.
    pub fn remove(&self, id: ConnectionId) {
        self.open.lock().unwrap().remove(&id);
    }

    /// The number of currently open connections.
    pub fn active_count(&self) -> usize {
        self.open.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_track_active_count() {
        let registry = ConnectionRegistry::new();
        let a = registry.next_id();
        let b = registry.next_id();
        assert_ne!(a, b);

        registry.insert(a);
        registry.insert(b);
        assert_eq!(registry.active_count(), 2);

        registry.remove(a);
        assert_eq!(registry.active_count(), 1);

        registry.remove(a);
        assert_eq!(registry.active_count(), 1, "removing twice is a no-op");
    }
}
