//! ConnectionHandler: owns the inbound lifecycle of one connection.
//!
//! ```text
//! run()
//!  ├─ register(sink)                 before the first read, so a concurrent
//!  │                                 broadcast can already reach this client
//!  ├─ loop
//!  │   ├─ next_payload()   ── Err ──┐
//!  │   ├─ decode_message() ── Err ──┤
//!  │   └─ publisher.submit()        │
//!  └─ teardown ◄────────────────────┘
//!      unregister(id); close() only if this handler removed the entry
//! ```
//!
//! A failed read or decode is never retried: it always ends the handler.  A
//! message dropped by broker backpressure is logged and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::application::broker::{Publisher, SubmitError};
use crate::domain::connection::{ConnectionId, MessageSink, MessageSource, ReadError};
use crate::domain::registry::ConnectionRegistry;
use crate::protocol::codec::{decode_message, DecodeError};

/// Why a [`ConnectionHandler`] stopped.
#[derive(Debug)]
pub enum HandlerExit {
    /// The transport reported a read failure, disconnect, or idle timeout.
    ReadFailed(ReadError),
    /// An inbound frame could not be decoded into a message.
    DecodeFailed(DecodeError),
    /// The broker is closed because the relay is shutting down.
    BrokerClosed,
}

impl std::fmt::Display for HandlerExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerExit::ReadFailed(e) => write!(f, "{e}"),
            HandlerExit::DecodeFailed(e) => write!(f, "{e}"),
            HandlerExit::BrokerClosed => write!(f, "relay shutting down"),
        }
    }
}

/// Reads messages from one connection and submits them to the broker.
pub struct ConnectionHandler<S> {
    source: S,
    sink: Arc<dyn MessageSink>,
    registry: Arc<ConnectionRegistry>,
    publisher: Publisher,
    idle_timeout: Option<Duration>,
}

impl<S: MessageSource> ConnectionHandler<S> {
    /// Creates a handler for an already-established connection.
    ///
    /// `source` and `sink` must be the two ends of the same connection.
    pub fn new(
        source: S,
        sink: Arc<dyn MessageSink>,
        registry: Arc<ConnectionRegistry>,
        publisher: Publisher,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            source,
            sink,
            registry,
            publisher,
            idle_timeout,
        }
    }

    /// The identity of the connection this handler owns.
    pub fn id(&self) -> ConnectionId {
        self.sink.id()
    }

    /// Runs the handler to completion and reports why it stopped.
    ///
    /// On return the connection is no longer registered and has been closed
    /// exactly once, either here or by the broadcast loop.
    pub async fn run(mut self) -> HandlerExit {
        let id = self.id();
        self.registry.register(Arc::clone(&self.sink)).await;
        info!("connection {id}: registered");

        let exit = self.read_loop(id).await;
        debug!("connection {id}: read loop ended: {exit}");

        match self.registry.unregister(id).await {
            Some(conn) => {
                conn.close().await;
                info!("connection {id}: unregistered and closed");
            }
            None => debug!("connection {id}: already removed by the broadcast loop"),
        }

        exit
    }

    async fn read_loop(&mut self, id: ConnectionId) -> HandlerExit {
        loop {
            let payload = match self.next_payload().await {
                Ok(payload) => payload,
                Err(e) => return HandlerExit::ReadFailed(e),
            };

            let msg = match decode_message(&payload) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("connection {id}: undecodable message: {e}");
                    return HandlerExit::DecodeFailed(e);
                }
            };

            debug!(
                "connection {id}: message from '{}' for column '{}'",
                msg.user.name, msg.column
            );

            match self.publisher.submit(msg).await {
                Ok(()) => {}
                Err(SubmitError::Closed) => return HandlerExit::BrokerClosed,
                Err(e) => warn!("connection {id}: message dropped: {e}"),
            }
        }
    }

    async fn next_payload(&mut self) -> Result<Vec<u8>, ReadError> {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.source.next_payload())
                .await
                .unwrap_or(Err(ReadError::IdleTimeout)),
            None => self.source.next_payload().await,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
