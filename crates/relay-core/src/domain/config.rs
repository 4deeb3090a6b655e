//! Relay tuning knobs.
//!
//! [`RelayConfig`] is a plain struct with no environment reads of its own; the
//! server binary fills it from CLI arguments and the optional TOML file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What a connection handler does when the broker queue is full.
///
/// Never "wait forever": a stuck broadcast would otherwise wedge every
/// reader behind it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Wait for space up to [`RelayConfig::submit_timeout`], then drop the
    /// message.
    #[default]
    Wait,
    /// Drop the message immediately if the queue is full.
    Drop,
}

/// All runtime settings of the relay core.
///
/// # Example
///
/// ```rust
/// use relay_core::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.broker_capacity, 256);
/// assert!(cfg.idle_timeout.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// Maximum number of messages waiting between the handlers and the
    /// broadcast loop.  Must be at least 1.
    pub broker_capacity: usize,

    /// Backpressure policy applied when the broker is full.
    pub overflow: OverflowPolicy,

    /// Upper bound on how long a handler waits for broker space under
    /// [`OverflowPolicy::Wait`].
    pub submit_timeout: Duration,

    /// Per-connection write deadline during fan-out.  `None` waits as long as
    /// the transport does.
    pub write_timeout: Option<Duration>,

    /// Read deadline per inbound frame.  `None` lets a silent peer stay
    /// connected indefinitely.
    pub idle_timeout: Option<Duration>,
}

impl Default for RelayConfig {
    /// | Field           | Default |
    /// |-----------------|---------|
    /// | broker_capacity | 256     |
    /// | overflow        | `Wait`  |
    /// | submit_timeout  | 5 s     |
    /// | write_timeout   | 10 s    |
    /// | idle_timeout    | none    |
    fn default() -> Self {
        Self {
            broker_capacity: 256,
            overflow: OverflowPolicy::Wait,
            submit_timeout: Duration::from_secs(5),
            write_timeout: Some(Duration::from_secs(10)),
            idle_timeout: None,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
