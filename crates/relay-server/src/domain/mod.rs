//! Domain layer for relay-server.
//!
//! Only configuration lives here: the message types and relay state belong
//! to `relay-core`, and everything that touches the network or the file
//! system is infrastructure.

pub mod config;

pub use config::{ConfigError, ServerConfig, Settings, DEFAULT_BIND, DEFAULT_WS_PATH};
