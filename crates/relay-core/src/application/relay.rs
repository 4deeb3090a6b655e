//! Relay: the explicitly owned service object tying the core together.
//!
//! One `Relay` is created at startup.  It owns the registry and the broker,
//! spawns the broadcast loop, and is cloned into every session task so each
//! connection handler is built from the same shared state.
//!
//! ```text
//! Relay::start(config)
//!  ├─ ConnectionRegistry   (Arc, shared)
//!  ├─ broker::channel()    Publisher (cloned per handler) / Subscription
//!  └─ tokio::spawn(BroadcastLoop::run)
//! ```
//!
//! The broadcast loop stops once every `Relay` clone and every handler has
//! been dropped, because that drops the last [`Publisher`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::application::broadcast::BroadcastLoop;
use crate::application::broker::{self, Publisher};
use crate::application::handler::ConnectionHandler;
use crate::domain::config::RelayConfig;
use crate::domain::connection::{MessageSink, MessageSource};
use crate::domain::registry::ConnectionRegistry;

/// Handle to a running relay.  Cheap to clone.
#[derive(Clone)]
pub struct Relay {
    registry: Arc<ConnectionRegistry>,
    publisher: Publisher,
    config: Arc<RelayConfig>,
}

impl Relay {
    /// Creates the registry and broker and spawns the broadcast loop.
    ///
    /// Must be called from within a Tokio runtime.  The returned handle
    /// completes when the broadcast loop stops.
    pub fn start(config: RelayConfig) -> (Self, JoinHandle<()>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let (publisher, subscription) = broker::channel(&config);

        let broadcast =
            BroadcastLoop::new(subscription, Arc::clone(&registry), config.write_timeout);
        let task = tokio::spawn(broadcast.run());

        info!(
            "relay started (broker capacity {}, overflow {:?})",
            config.broker_capacity, config.overflow
        );

        let relay = Self {
            registry,
            publisher,
            config: Arc::new(config),
        };
        (relay, task)
    }

    /// Builds the handler for a newly established connection.
    pub fn handler<S: MessageSource>(
        &self,
        source: S,
        sink: Arc<dyn MessageSink>,
    ) -> ConnectionHandler<S> {
        ConnectionHandler::new(
            source,
            sink,
            Arc::clone(&self.registry),
            self.publisher.clone(),
            self.config.idle_timeout,
        )
    }

    /// The shared connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// A publisher feeding the broadcast loop.
    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// The configuration the relay was started with.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Unregisters and closes every connection.  Returns how many were closed.
    ///
    /// Handlers notice the closed transport on their next read and exit; once
    /// they and every `Relay` clone are gone, the broadcast loop stops.
    pub async fn shutdown(&self) -> usize {
        let connections = self.registry.drain().await;
        for conn in &connections {
            conn.close().await;
        }
        info!("relay shut down; closed {} connection(s)", connections.len());
        connections.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
