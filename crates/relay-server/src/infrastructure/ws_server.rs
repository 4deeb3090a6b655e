//! WebSocket server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Starting the [`Relay`] (registry, broker, broadcast loop).
//! 3. Accepting incoming TCP connections.
//! 4. Upgrading each connection to a WebSocket on the configured path and
//!    answering `404 Not Found` on any other path.
//! 5. Running one [`ConnectionHandler`](relay_core::ConnectionHandler) per
//!    session in its own Tokio task.
//! 6. Shutting down when the `running` flag is cleared: every connection is
//!    closed and the broadcast loop is given a short grace period to finish.
//!
//! # Failure isolation
//!
//! A failed upgrade, a peer that disconnects mid-handshake, or a malformed
//! message only ends that one session.  Only failing to bind the listener is
//! fatal.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

use relay_core::{HandlerExit, MessageSink, Relay};

use crate::domain::config::ServerConfig;
use crate::infrastructure::ws_conn::split_connection;

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Upper bound on the HTTP upgrade exchange for one connection.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown waits for the broadcast loop to drain.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// ── Public API ────────────────────────────────────────────────────────────────

/// Binds the listener and runs the relay until `running` is set to `false`.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot be bound (e.g., the port is
/// already in use or the process lacks permission to bind).
pub async fn run_server(config: ServerConfig, running: Arc<AtomicBool>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind listener on {}", config.bind_addr))?;

    let local_addr = listener
        .local_addr()
        .context("failed to read listener address")?;
    info!("relay listening on ws://{local_addr}{}", config.ws_path);

    let (relay, broadcast_task) = Relay::start(config.relay.clone());

    serve(listener, relay.clone(), &config.ws_path, running).await;

    relay.shutdown().await;
    // The broadcast loop ends once the last publisher is gone; this clone is
    // one of them.
    drop(relay);

    match timeout(SHUTDOWN_GRACE, broadcast_task).await {
        Ok(Ok(())) => debug!("broadcast loop finished"),
        Ok(Err(e)) => error!("broadcast loop panicked: {e}"),
        Err(_) => warn!(
            "broadcast loop still running after {}s; abandoning it",
            SHUTDOWN_GRACE.as_secs()
        ),
    }

    Ok(())
}

/// Runs the accept loop on an already-bound listener until `running` is set
/// to `false`.
///
/// Each accepted connection is handed to a dedicated Tokio task so one slow
/// client never blocks the accept loop.  The caller owns `relay` and is
/// responsible for shutting it down afterwards.
pub async fn serve(listener: TcpListener, relay: Relay, ws_path: &str, running: Arc<AtomicBool>) {
    let ws_path: Arc<str> = Arc::from(ws_path);

    loop {
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Short timeout so the flag is re-checked even when nobody connects.
        match timeout(ACCEPT_POLL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                debug!("new connection from {peer_addr}");
                let relay = relay.clone();
                let ws_path = Arc::clone(&ws_path);
                tokio::spawn(async move {
                    handle_client_session(stream, peer_addr, relay, ws_path).await;
                });
            }
            Ok(Err(e)) => {
                // Transient (e.g., too many open file descriptors).
                error!("accept error: {e}");
            }
            Err(_) => {}
        }
    }
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Entry point of each per-session task.  Wraps [`run_session`] and logs the
/// outcome.
async fn handle_client_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    relay: Relay,
    ws_path: Arc<str>,
) {
    match run_session(stream, peer_addr, relay, &ws_path).await {
        Ok(HandlerExit::ReadFailed(e)) => info!("session {peer_addr} ended: {e}"),
        Ok(exit) => warn!("session {peer_addr} ended: {exit}"),
        Err(e) => warn!("session {peer_addr} closed with error: {e:#}"),
    }
}

/// Upgrades the connection and runs its handler to completion.
///
/// # Errors
///
/// Returns an error if the handshake times out, the request is for the wrong
/// path, or the request is not a valid WebSocket upgrade.
async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    relay: Relay,
    ws_path: &str,
) -> anyhow::Result<HandlerExit> {
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        check_path(req.uri().path(), ws_path)?;
        Ok(resp)
    };

    let ws_stream = timeout(HANDSHAKE_TIMEOUT, accept_hdr_async(stream, callback))
        .await
        .with_context(|| format!("WebSocket handshake with {peer_addr} timed out"))?
        .with_context(|| format!("WebSocket upgrade failed for {peer_addr}"))?;

    let (source, sink) = split_connection(ws_stream);
    let sink: Arc<dyn MessageSink> = Arc::new(sink);
    let handler = relay.handler(source, sink);
    info!(
        "session {peer_addr}: WebSocket established as connection {}",
        handler.id()
    );

    Ok(handler.run().await)
}

/// Accepts the upgrade only on `expected`; anything else gets a `404`.
///
/// Query strings are not part of `path` and are ignored.
fn check_path(path: &str, expected: &str) -> Result<(), ErrorResponse> {
    if path == expected {
        return Ok(());
    }
    let mut resp = ErrorResponse::new(Some(format!("no WebSocket endpoint at {path}")));
    *resp.status_mut() = StatusCode::NOT_FOUND;
    Err(resp)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
