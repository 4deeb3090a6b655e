//! Domain layer for relay-core.
//!
//! Connection identity, the transport traits every connection implements,
//! the registry of live connections, and the relay configuration.  Nothing
//! here opens a socket.

pub mod config;
pub mod connection;
pub mod registry;

pub use config::{OverflowPolicy, RelayConfig};
pub use connection::{
    new_connection_id, ConnectionId, MessageSink, MessageSource, ReadError, WriteError,
};
pub use registry::ConnectionRegistry;
