//! The broker: a bounded hand-off queue between connection handlers and the
//! broadcast loop.
//!
//! Many producers ([`Publisher`], one clone per handler), one consumer
//! ([`Subscription`], owned by the broadcast loop), arrival order preserved.
//! The queue is the relay's only intentional synchronisation point.
//!
//! # Backpressure
//!
//! The queue is bounded by [`RelayConfig::broker_capacity`].  When it is full
//! the publisher follows [`OverflowPolicy`]:
//!
//! - `Wait`: suspend until the broadcast loop drains a slot, but never longer
//!   than [`RelayConfig::submit_timeout`].  On timeout the message is dropped.
//! - `Drop`: drop the message immediately.
//!
//! Either way the publishing connection stays open; only this one message is
//! lost.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};

use crate::domain::config::{OverflowPolicy, RelayConfig};
use crate::protocol::messages::Message;

/// Errors from [`Publisher::submit`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The queue was full and the policy is [`OverflowPolicy::Drop`].
    #[error("broker queue is full")]
    Full,

    /// The queue stayed full for the whole submit timeout.
    #[error("broker queue stayed full for {0:?}")]
    TimedOut(Duration),

    /// The broadcast loop is gone; the relay is shutting down.
    #[error("broker is closed")]
    Closed,
}

/// Creates a connected publisher/subscription pair sized from `config`.
pub fn channel(config: &RelayConfig) -> (Publisher, Subscription) {
    // `mpsc::channel(0)` panics; a zero capacity is treated as one slot.
    let (tx, rx) = mpsc::channel(config.broker_capacity.max(1));
    let publisher = Publisher {
        tx,
        overflow: config.overflow,
        submit_timeout: config.submit_timeout,
    };
    (publisher, Subscription { rx })
}

/// Producer half of the broker.  Cheap to clone; each handler holds one.
#[derive(Debug, Clone)]
pub struct Publisher {
    tx: mpsc::Sender<Message>,
    overflow: OverflowPolicy,
    submit_timeout: Duration,
}

impl Publisher {
    /// Queues one message for broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Full`] or [`SubmitError::TimedOut`] when the
    /// message was dropped because of backpressure, and
    /// [`SubmitError::Closed`] when the broadcast loop has stopped.
    pub async fn submit(&self, msg: Message) -> Result<(), SubmitError> {
        match self.overflow {
            OverflowPolicy::Wait => match self.tx.send_timeout(msg, self.submit_timeout).await {
                Ok(()) => Ok(()),
                Err(SendTimeoutError::Timeout(_)) => {
                    Err(SubmitError::TimedOut(self.submit_timeout))
                }
                Err(SendTimeoutError::Closed(_)) => Err(SubmitError::Closed),
            },
            OverflowPolicy::Drop => match self.tx.try_send(msg) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(SubmitError::Full),
                Err(TrySendError::Closed(_)) => Err(SubmitError::Closed),
            },
        }
    }

    /// Returns `true` once the subscription has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of the broker, owned by the broadcast loop.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Message>,
}

impl Subscription {
    /// Waits for the next message.
    ///
    /// Returns `None` once every [`Publisher`] has been dropped and the queue
    /// is empty.
    pub async fn next(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
