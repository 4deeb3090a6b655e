//! Connection identity and the transport seams.
//!
//! A connection is split into two ends:
//!
//! - [`MessageSource`] – the read end.  Owned exclusively by the connection's
//!   [`ConnectionHandler`](crate::application::handler::ConnectionHandler).
//! - [`MessageSink`] – the write end.  Shared (behind an `Arc`) between the
//!   handler and the [`ConnectionRegistry`](crate::domain::registry::ConnectionRegistry),
//!   which is how the broadcast loop reaches it.
//!
//! The relay never sees sockets.  The WebSocket transport in `relay-server`
//! implements both traits; tests implement them with in-memory channels.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Opaque identity of one connection, used as the registry key.
pub type ConnectionId = Uuid;

/// Generates a fresh, random connection identity.
pub fn new_connection_id() -> ConnectionId {
    Uuid::new_v4()
}

/// Errors that end the read side of a connection.
///
/// Every variant is terminal: the handler unregisters the connection and
/// stops.  There is no retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The peer closed the connection (EOF or a Close frame).
    #[error("connection closed by peer")]
    Closed,

    /// The transport failed (reset, protocol violation, ...).
    #[error("transport read error: {0}")]
    Transport(String),

    /// Nothing arrived within the configured idle timeout.
    #[error("no data received within the idle timeout")]
    IdleTimeout,
}

/// Errors from writing one outbound frame.
///
/// Terminal for that one connection only; never propagated to the publisher
/// of the message or to other receivers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// The connection is already closed.
    #[error("connection already closed")]
    Closed,

    /// The transport failed while writing.
    #[error("transport write error: {0}")]
    Transport(String),

    /// The write did not complete within the configured write timeout.
    #[error("write timed out")]
    TimedOut,
}

/// The write end of a connection.
///
/// Implementations must tolerate concurrent calls from the broadcast loop and
/// the owning handler, and [`close`](MessageSink::close) must be idempotent.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// The identity under which this connection is registered.
    fn id(&self) -> ConnectionId;

    /// Sends one already-encoded message as a single frame.
    async fn send_text(&self, text: &str) -> Result<(), WriteError>;

    /// Closes the connection and releases its transport resources.
    async fn close(&self);
}

/// The read end of a connection.
#[async_trait]
pub trait MessageSource: Send {
    /// Waits for the next inbound frame and returns its raw payload.
    ///
    /// Control frames (ping/pong) are handled by the transport and never
    /// surface here.
    async fn next_payload(&mut self) -> Result<Vec<u8>, ReadError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
