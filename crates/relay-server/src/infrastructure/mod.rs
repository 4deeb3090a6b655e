//! Infrastructure layer for relay-server.
//!
//! Everything that does I/O lives here:
//!
//! - Reading the optional TOML config file
//! - Binding the TCP listener and running the accept loop
//! - Performing the WebSocket upgrade handshake
//! - Adapting WebSocket halves to relay-core's connection traits
//!
//! # What does NOT belong here?
//!
//! - Relay semantics (registry, broker, broadcast loop live in `relay-core`)
//! - Configuration validation (that is the domain layer)

pub mod config_file;
pub mod ws_conn;
pub mod ws_server;

pub use config_file::{load_config, parse_config, FileConfig};
pub use ws_conn::{split_connection, WsSink, WsSource};
pub use ws_server::{run_server, serve};
