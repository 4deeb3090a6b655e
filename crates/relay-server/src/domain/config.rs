//! Server configuration types.
//!
//! Settings come from three places, highest precedence first:
//!
//! 1. CLI arguments and their environment variables (`PORT`, `RELAY_BIND`, ...)
//! 2. The optional TOML config file
//! 3. Built-in defaults
//!
//! Each source is reduced to a [`Settings`] value (every field optional).
//! Sources are layered with [`Settings::or`] and the result is validated into
//! a [`ServerConfig`] by [`Settings::into_server_config`].  The listen port
//! has no default: if no source provides one, startup fails.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use relay_core::{OverflowPolicy, RelayConfig};
use thiserror::Error;

/// Path WebSocket upgrades are accepted on when none is configured.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Interface the listener binds to when none is configured.
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Errors that make the configuration unusable.  All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No source provided a listen port.
    #[error("must provide PORT as an environment variable, --port, or `port` in the config file")]
    MissingPort,

    /// The bind host and port do not form a socket address.
    #[error("invalid bind address: '{0}'")]
    InvalidAddress(String),

    /// A value is out of range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the expected schema.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Fully resolved runtime configuration for the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the TCP listener binds to.
    pub bind_addr: SocketAddr,
    /// HTTP path on which WebSocket upgrades are accepted.
    pub ws_path: String,
    /// Tuning passed through to the relay core.
    pub relay: RelayConfig,
}

impl ServerConfig {
    /// Builds a config for `bind_addr` with every other setting at its default.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ws_path: DEFAULT_WS_PATH.to_string(),
            relay: RelayConfig::default(),
        }
    }
}

/// One layer of partially specified settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub ws_path: Option<String>,
    pub broker_capacity: Option<usize>,
    pub overflow: Option<OverflowPolicy>,
    pub submit_timeout_ms: Option<u64>,
    /// `0` disables the write timeout.
    pub write_timeout_ms: Option<u64>,
    /// `0` disables the idle timeout.
    pub idle_timeout_secs: Option<u64>,
}

impl Settings {
    /// Fills every field missing from `self` with the value from `fallback`.
    pub fn or(self, fallback: Settings) -> Settings {
        Settings {
            port: self.port.or(fallback.port),
            bind: self.bind.or(fallback.bind),
            ws_path: self.ws_path.or(fallback.ws_path),
            broker_capacity: self.broker_capacity.or(fallback.broker_capacity),
            overflow: self.overflow.or(fallback.overflow),
            submit_timeout_ms: self.submit_timeout_ms.or(fallback.submit_timeout_ms),
            write_timeout_ms: self.write_timeout_ms.or(fallback.write_timeout_ms),
            idle_timeout_secs: self.idle_timeout_secs.or(fallback.idle_timeout_secs),
        }
    }

    /// Applies defaults and validates the result.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingPort`] if no port was given.
    /// - [`ConfigError::InvalidAddress`] if the bind host is not an IP address.
    /// - [`ConfigError::InvalidValue`] for a zero broker capacity or a
    ///   WebSocket path that does not start with `/`.
    pub fn into_server_config(self) -> Result<ServerConfig, ConfigError> {
        let port = self.port.ok_or(ConfigError::MissingPort)?;
        let bind = self.bind.unwrap_or_else(|| DEFAULT_BIND.to_string());
        let ip: IpAddr = bind
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{bind}:{port}")))?;
        let bind_addr = SocketAddr::new(ip, port);

        let ws_path = self.ws_path.unwrap_or_else(|| DEFAULT_WS_PATH.to_string());
        if !ws_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "ws_path",
                reason: format!("'{ws_path}' must start with '/'"),
            });
        }

        let defaults = RelayConfig::default();
        let broker_capacity = self.broker_capacity.unwrap_or(defaults.broker_capacity);
        if broker_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "broker_capacity",
                reason: "must be at least 1".to_string(),
            });
        }

        let relay = RelayConfig {
            broker_capacity,
            overflow: self.overflow.unwrap_or(defaults.overflow),
            submit_timeout: self
                .submit_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.submit_timeout),
            write_timeout: match self.write_timeout_ms {
                Some(0) => None,
                Some(ms) => Some(Duration::from_millis(ms)),
                None => defaults.write_timeout,
            },
            idle_timeout: match self.idle_timeout_secs {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.idle_timeout,
            },
        };

        Ok(ServerConfig {
            bind_addr,
            ws_path,
            relay,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
