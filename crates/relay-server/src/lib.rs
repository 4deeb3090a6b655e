//! relay-server library crate.
//!
//! Puts the board relay on the network: clients connect over WebSocket,
//! every JSON message one of them sends is rebroadcast to all of them.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Clients (JSON over WebSocket)
//!         ↕
//! [relay-server]
//!   ├── domain/           ServerConfig, layered Settings, ConfigError
//!   └── infrastructure/
//!         ├── config_file/ TOML config file
//!         ├── ws_conn/     WebSocket halves as MessageSource / MessageSink
//!         └── ws_server/   Accept loop and per-session tasks (tokio-tungstenite)
//!         ↕
//! [relay-core]  registry, broker, broadcast loop
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `infrastructure` depends on `domain`, `relay-core`, `tokio` and
//!   `tungstenite`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Infrastructure layer: config file, WebSocket transport and server.
pub mod infrastructure;
