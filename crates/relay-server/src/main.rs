//! Board relay server: entry point.
//!
//! Accepts WebSocket connections and rebroadcasts every JSON message a client
//! sends to all connected clients, in the order the relay received them.
//!
//! # Usage
//!
//! ```text
//! relay-server [OPTIONS]
//!
//! Options:
//!   --port <PORT>                  Listen port (required unless in the config file)
//!   --bind <IP>                    Interface to bind [default: 0.0.0.0]
//!   --ws-path <PATH>               WebSocket endpoint path [default: /ws]
//!   --config <FILE>                Optional TOML config file
//!   --broker-capacity <N>          Pending-message queue size [default: 256]
//!   --overflow <wait|drop>         Full-queue policy [default: wait]
//!   --submit-timeout-ms <MS>       Max wait for queue space [default: 5000]
//!   --write-timeout-ms <MS>        Per-client write deadline, 0 = none [default: 10000]
//!   --idle-timeout-secs <SECS>     Drop silent clients, 0 = never [default: 0]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable              | Equivalent flag         |
//! |-----------------------|-------------------------|
//! | `PORT`                | `--port`                |
//! | `RELAY_BIND`          | `--bind`                |
//! | `RELAY_WS_PATH`       | `--ws-path`             |
//! | `RELAY_CONFIG`        | `--config`              |
//! | `RELAY_BROKER_CAPACITY` | `--broker-capacity`   |
//! | `RELAY_OVERFLOW`      | `--overflow`            |
//! | `RELAY_SUBMIT_TIMEOUT_MS` | `--submit-timeout-ms` |
//! | `RELAY_WRITE_TIMEOUT_MS`  | `--write-timeout-ms`  |
//! | `RELAY_IDLE_TIMEOUT_SECS` | `--idle-timeout-secs` |
//!
//! CLI flags and their environment variables win over the config file, which
//! wins over the built-in defaults.  Log verbosity follows `RUST_LOG`.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_core::OverflowPolicy;
use relay_server::domain::{ServerConfig, Settings};
use relay_server::infrastructure::{load_config, run_server};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Board relay server.
///
/// Every option is optional on the command line so the config file can
/// supply it; defaults are applied after the sources are merged.
#[derive(Debug, Parser)]
#[command(
    name = "relay-server",
    about = "Rebroadcasts JSON board messages to every connected WebSocket client",
    version
)]
struct Cli {
    /// TCP port to listen on.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// IP address to bind to.
    ///
    /// `0.0.0.0` accepts connections on every interface, `127.0.0.1` only
    /// local ones.
    #[arg(long, env = "RELAY_BIND")]
    bind: Option<String>,

    /// HTTP path on which WebSocket upgrades are accepted.
    #[arg(long, env = "RELAY_WS_PATH")]
    ws_path: Option<String>,

    /// Path to a TOML config file.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Number of messages the broker queue holds before applying the
    /// overflow policy.
    #[arg(long, env = "RELAY_BROKER_CAPACITY")]
    broker_capacity: Option<usize>,

    /// What to do when the broker queue is full: `wait` or `drop`.
    #[arg(long, env = "RELAY_OVERFLOW", value_parser = parse_overflow)]
    overflow: Option<OverflowPolicy>,

    /// Longest a sender waits for queue space under the `wait` policy.
    #[arg(long, env = "RELAY_SUBMIT_TIMEOUT_MS")]
    submit_timeout_ms: Option<u64>,

    /// Per-client write deadline in milliseconds; `0` disables it.
    #[arg(long, env = "RELAY_WRITE_TIMEOUT_MS")]
    write_timeout_ms: Option<u64>,

    /// Disconnect clients silent for this many seconds; `0` disables it.
    #[arg(long, env = "RELAY_IDLE_TIMEOUT_SECS")]
    idle_timeout_secs: Option<u64>,
}

fn parse_overflow(s: &str) -> Result<OverflowPolicy, String> {
    match s.to_ascii_lowercase().as_str() {
        "wait" => Ok(OverflowPolicy::Wait),
        "drop" => Ok(OverflowPolicy::Drop),
        other => Err(format!("expected 'wait' or 'drop', got '{other}'")),
    }
}

impl Cli {
    /// The settings layer given on the command line and in the environment.
    fn settings(&self) -> Settings {
        Settings {
            port: self.port,
            bind: self.bind.clone(),
            ws_path: self.ws_path.clone(),
            broker_capacity: self.broker_capacity,
            overflow: self.overflow,
            submit_timeout_ms: self.submit_timeout_ms,
            write_timeout_ms: self.write_timeout_ms,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }

    /// Merges the CLI layer over the config file (if any) and validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, no port was
    /// given anywhere, or a value is invalid.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let file = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?
                .into_settings(),
            None => Settings::default(),
        };

        let config = self.settings().or(file).into_server_config()?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_server_config()?;

    info!(
        "board relay starting on {} (path {}, broker capacity {})",
        config.bind_addr, config.ws_path, config.relay.broker_capacity
    );

    // ── Graceful shutdown flag ─────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_server(config, running).await?;

    info!("board relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Builds a `Cli` without touching the process environment.
    fn cli_with_port(port: Option<u16>) -> Cli {
        Cli {
            port,
            bind: None,
            ws_path: None,
            config: None,
            broker_capacity: None,
            overflow: None,
            submit_timeout_ms: None,
            write_timeout_ms: None,
            idle_timeout_secs: None,
        }
    }

    #[test]
    fn test_cli_port_flag_parses() {
        let cli = Cli::try_parse_from(["relay-server", "--port", "8000"]).unwrap();
        assert_eq!(cli.port, Some(8000));
    }

    #[test]
    fn test_cli_overflow_flag_parses_case_insensitively() {
        let cli =
            Cli::try_parse_from(["relay-server", "--port", "1", "--overflow", "DROP"]).unwrap();
        assert_eq!(cli.overflow, Some(OverflowPolicy::Drop));
    }

    #[test]
    fn test_cli_rejects_unknown_overflow_policy() {
        let result = Cli::try_parse_from(["relay-server", "--overflow", "block"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_non_numeric_port() {
        let result = Cli::try_parse_from(["relay-server", "--port", "eighty"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_overflow_error_names_the_value() {
        let err = parse_overflow("sometimes").unwrap_err();
        assert!(err.contains("sometimes"));
    }

    #[test]
    fn test_into_server_config_without_port_is_an_error() {
        // Arrange: no port on the command line and no config file.
        let cli = cli_with_port(None);

        // Act
        let result = cli.into_server_config();

        // Assert
        assert!(result.is_err());
    }

    #[test]
    fn test_into_server_config_applies_defaults() {
        let config = cli_with_port(Some(8000)).into_server_config().unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8000");
        assert_eq!(config.ws_path, "/ws");
    }

    #[test]
    fn test_into_server_config_cli_overrides_relay_tuning() {
        let cli = Cli {
            write_timeout_ms: Some(0),
            submit_timeout_ms: Some(50),
            ..cli_with_port(Some(8000))
        };
        let config = cli.into_server_config().unwrap();
        assert_eq!(config.relay.write_timeout, None);
        assert_eq!(config.relay.submit_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_into_server_config_missing_config_file_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here/relay.toml")),
            ..cli_with_port(Some(8000))
        };
        let err = cli.into_server_config().unwrap_err();
        assert!(format!("{err:#}").contains("failed to load config file"));
    }

    #[test]
    fn test_into_server_config_reads_port_from_file() {
        // Arrange: a config file that supplies the port and path.
        let path = std::env::temp_dir().join(format!(
            "relay-server-test-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[server]\nport = 8123\nws_path = \"/board\"\n").unwrap();
        let cli = Cli {
            config: Some(path.clone()),
            ..cli_with_port(None)
        };

        // Act
        let config = cli.into_server_config().unwrap();
        std::fs::remove_file(&path).unwrap();

        // Assert
        assert_eq!(config.bind_addr.port(), 8123);
        assert_eq!(config.ws_path, "/board");
    }

    #[test]
    fn test_into_server_config_cli_port_beats_file_port() {
        let path = std::env::temp_dir().join(format!(
            "relay-server-test-precedence-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[server]\nport = 8123\n").unwrap();
        let cli = Cli {
            config: Some(path.clone()),
            ..cli_with_port(Some(9000))
        };

        let config = cli.into_server_config().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
    }
}
