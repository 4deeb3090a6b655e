//! # relay-core
//!
//! The in-process heart of the board relay: every message a client submits is
//! rebroadcast to every client that is currently connected.
//!
//! This crate knows nothing about sockets or WebSockets.  Transports plug in
//! through two small traits ([`MessageSource`] for the read end of a
//! connection, [`MessageSink`] for the write end), which keeps the whole
//! relay testable with in-memory connections.
//!
//! # Architecture overview
//!
//! ```text
//! ConnectionHandler (one per client)      BroadcastLoop (exactly one)
//!   register ─────────────┐                 ┌──── snapshot()
//!   recv → decode         ▼                 ▼
//!   submit ──► Broker ─► ConnectionRegistry ◄── unregister on write error
//!   unregister on read error
//! ```
//!
//! - **`protocol`** – The JSON wire shape of a relayed message and its codec.
//! - **`domain`** – Connection identity, the transport traits, the registry,
//!   and the relay tuning knobs.
//! - **`application`** – The broker, the per-connection handler, the broadcast
//!   loop, and the [`Relay`] service object that wires them together.

pub mod application;
pub mod domain;
pub mod protocol;

pub use application::broadcast::{BroadcastLoop, FanOutReport};
pub use application::broker::{Publisher, SubmitError, Subscription};
pub use application::handler::{ConnectionHandler, HandlerExit};
pub use application::relay::Relay;
pub use domain::config::{OverflowPolicy, RelayConfig};
pub use domain::connection::{
    new_connection_id, ConnectionId, MessageSink, MessageSource, ReadError, WriteError,
};
pub use domain::registry::ConnectionRegistry;
pub use protocol::codec::{decode_message, encode_message, DecodeError};
pub use protocol::messages::{Message, User};
