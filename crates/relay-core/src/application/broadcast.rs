//! BroadcastLoop: the single consumer of the broker.
//!
//! For every message it dequeues, the loop encodes the JSON once, takes a
//! snapshot of the registry, and writes the same text to each connection in
//! turn.  A connection whose write fails (or exceeds the write timeout) is
//! unregistered and closed; delivery to the rest of the snapshot carries on.
//!
//! One message is completely fanned out before the next is dequeued, so each
//! connection sees messages in broker order.  A connection that registers
//! while a fan-out is in flight may miss that one message but gets every
//! later one.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::application::broker::Subscription;
use crate::domain::connection::{MessageSink, WriteError};
use crate::domain::registry::ConnectionRegistry;
use crate::protocol::codec::encode_message;
use crate::protocol::messages::Message;

/// Outcome of one fan-out cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Connections that accepted the message.
    pub delivered: usize,
    /// Connections that failed and were pruned.
    pub pruned: usize,
}

/// Drains the broker and fans each message out to every registered connection.
pub struct BroadcastLoop {
    subscription: Subscription,
    registry: Arc<ConnectionRegistry>,
    write_timeout: Option<Duration>,
}

impl BroadcastLoop {
    /// Creates the loop.  Nothing happens until [`run`](Self::run) is awaited.
    pub fn new(
        subscription: Subscription,
        registry: Arc<ConnectionRegistry>,
        write_timeout: Option<Duration>,
    ) -> Self {
        Self {
            subscription,
            registry,
            write_timeout,
        }
    }

    /// Runs until every publisher has been dropped.
    pub async fn run(mut self) {
        info!("broadcast loop started");
        while let Some(msg) = self.subscription.next().await {
            let report = self.fan_out(&msg).await;
            debug!(
                "broadcast delivered to {} connection(s), pruned {}",
                report.delivered, report.pruned
            );
        }
        info!("broker closed; broadcast loop stopped");
    }

    /// Delivers one message to a snapshot of the registry.
    pub async fn fan_out(&self, msg: &Message) -> FanOutReport {
        let text = match encode_message(msg) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to encode message for broadcast: {e}");
                return FanOutReport::default();
            }
        };

        let mut report = FanOutReport::default();
        for conn in self.registry.snapshot().await {
            match self.write(conn.as_ref(), &text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    let id = conn.id();
                    warn!("connection {id}: write failed, dropping connection: {e}");
                    if let Some(removed) = self.registry.unregister(id).await {
                        removed.close().await;
                    }
                    report.pruned += 1;
                }
            }
        }
        report
    }

    async fn write(&self, conn: &dyn MessageSink, text: &str) -> Result<(), WriteError> {
        match self.write_timeout {
            Some(limit) => tokio::time::timeout(limit, conn.send_text(text))
                .await
                .unwrap_or(Err(WriteError::TimedOut)),
            None => conn.send_text(text).await,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
