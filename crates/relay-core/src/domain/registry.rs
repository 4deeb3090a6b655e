//! ConnectionRegistry: the set of connections eligible to receive broadcasts.
//!
//! The registry is written from two places at once: every connection handler
//! (register on start, unregister on read failure) and the broadcast loop
//! (unregister on write failure).  All access goes through a
//! `tokio::sync::RwLock`, and the lock is never held across a network write:
//! [`snapshot`](ConnectionRegistry::snapshot) copies the `Arc`s out so the
//! broadcast loop iterates a point-in-time list.
//!
//! # Release ownership
//!
//! [`unregister`](ConnectionRegistry::unregister) returns the removed sink.
//! Exactly one caller can get `Some` for a given registration, and that
//! caller is the one that closes the connection.  This is what keeps a
//! connection from being released twice when its handler and the broadcast
//! loop both notice the failure at the same moment.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::connection::{ConnectionId, MessageSink};

/// Concurrency-safe registry of live connections keyed by [`ConnectionId`].
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<dyn MessageSink>>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection.
    ///
    /// Idempotent: registering an id that is already present keeps the
    /// existing entry, so the connection still receives each broadcast once.
    /// Returns `true` if the connection was newly added.
    pub async fn register(&self, conn: Arc<dyn MessageSink>) -> bool {
        let mut connections = self.connections.write().await;
        let id = conn.id();
        if connections.contains_key(&id) {
            return false;
        }
        connections.insert(id, conn);
        true
    }

    /// Removes a connection, returning it if it was present.
    ///
    /// A no-op returning `None` when the id is absent, including when another
    /// task removed it first.
    pub async fn unregister(&self, id: ConnectionId) -> Option<Arc<dyn MessageSink>> {
        self.connections.write().await.remove(&id)
    }

    /// Returns a point-in-time copy of every registered connection.
    pub async fn snapshot(&self) -> Vec<Arc<dyn MessageSink>> {
        self.connections.read().await.values().cloned().collect()
    }

    /// Removes and returns every registered connection.
    pub async fn drain(&self) -> Vec<Arc<dyn MessageSink>> {
        self.connections
            .write()
            .await
            .drain()
            .map(|(_, conn)| conn)
            .collect()
    }

    /// Returns `true` if `id` is currently registered.
    pub async fn contains(&self, id: ConnectionId) -> bool {
        self.connections.read().await.contains_key(&id)
    }

    /// Number of registered connections.
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Returns `true` if nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
