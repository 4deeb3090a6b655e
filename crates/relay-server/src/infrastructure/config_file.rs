//! TOML config file loading.
//!
//! The file is optional and every key in it is optional.  Missing keys fall
//! through to CLI/environment values or built-in defaults (see
//! [`Settings`](crate::domain::Settings)).
//!
//! ```toml
//! [server]
//! port = 8000
//! bind = "0.0.0.0"
//! ws_path = "/ws"
//!
//! [relay]
//! broker_capacity = 256
//! overflow = "wait"        # or "drop"
//! submit_timeout_ms = 5000
//! write_timeout_ms = 10000 # 0 disables
//! idle_timeout_secs = 0    # 0 disables
//! ```

use std::path::Path;

use relay_core::OverflowPolicy;
use serde::Deserialize;

use crate::domain::config::{ConfigError, Settings};

/// On-disk schema of the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub relay: RelaySection,
}

/// `[server]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub ws_path: Option<String>,
}

/// `[relay]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RelaySection {
    pub broker_capacity: Option<usize>,
    pub overflow: Option<OverflowPolicy>,
    pub submit_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Flattens the file into one settings layer.
    pub fn into_settings(self) -> Settings {
        Settings {
            port: self.server.port,
            bind: self.server.bind,
            ws_path: self.server.ws_path,
            broker_capacity: self.relay.broker_capacity,
            overflow: self.relay.overflow,
            submit_timeout_ms: self.relay.submit_timeout_ms,
            write_timeout_ms: self.relay.write_timeout_ms,
            idle_timeout_secs: self.relay.idle_timeout_secs,
        }
    }
}

/// Parses config file text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for invalid TOML, unknown keys, or values
/// of the wrong type.
pub fn parse_config(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses the config file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if its content is invalid.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
