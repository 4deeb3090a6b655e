//! Application layer for relay-core.
//!
//! The moving parts of the relay: the broker queue, the per-connection
//! handler that feeds it, the single broadcast loop that drains it, and the
//! [`Relay`] service object that owns them.
//!
//! Everything here talks to connections only through the
//! [`MessageSink`](crate::domain::MessageSink) and
//! [`MessageSource`](crate::domain::MessageSource) traits.

pub mod broadcast;
pub mod broker;
pub mod handler;
pub mod relay;

pub use broadcast::{BroadcastLoop, FanOutReport};
pub use broker::{Publisher, SubmitError, Subscription};
pub use handler::{ConnectionHandler, HandlerExit};
pub use relay::Relay;
