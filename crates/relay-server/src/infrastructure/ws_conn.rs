//! WebSocket implementations of the relay-core connection traits.
//!
//! After the handshake, [`split_connection`] splits the WebSocket into:
//!
//! - [`WsSource`] – the read half, handed to the connection handler.
//! - [`WsSink`] – the write half, shared with the registry so the broadcast
//!   loop can reach it.
//!
//! The two halves share a close signal.  Once anyone closes the sink (the
//! broadcast loop after a failed write, the handler on teardown, or relay
//! shutdown), the source's next read returns [`ReadError::Closed`] even if
//! the peer never answers the Close frame.
//!
//! # Frame handling
//!
//! | Inbound frame | Result                                       |
//! |---------------|----------------------------------------------|
//! | Text          | payload bytes                                |
//! | Binary        | payload bytes (decoded as JSON like text)    |
//! | Ping / Pong   | skipped; tungstenite answers pings itself    |
//! | Close         | `ReadError::Closed`                          |
//!
//! Outbound messages are always sent as text frames.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::WebSocketStream;
use tracing::debug;

use relay_core::{new_connection_id, ConnectionId, MessageSink, MessageSource, ReadError, WriteError};

/// Upper bound on sending the Close frame to an unresponsive peer.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Splits an established WebSocket into its relay-facing halves under a
/// fresh [`ConnectionId`].
pub fn split_connection<S>(ws: WebSocketStream<S>) -> (WsSource<S>, WsSink<S>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = ws.split();
    let (closed_tx, closed_rx) = watch::channel(false);
    let sink = WsSink {
        id: new_connection_id(),
        tx: Mutex::new(tx),
        closed: closed_tx,
    };
    let source = WsSource {
        rx,
        closed: closed_rx,
    };
    (source, sink)
}

// ── Write half ────────────────────────────────────────────────────────────────

/// Write half of a WebSocket connection.
pub struct WsSink<S> {
    id: ConnectionId,
    // `tokio::sync::Mutex` so a writer can hold the lock across `.await`.
    tx: Mutex<SplitSink<WebSocketStream<S>, WsMessage>>,
    closed: watch::Sender<bool>,
}

#[async_trait]
impl<S> MessageSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn id(&self) -> ConnectionId {
        self.id
    }

    async fn send_text(&self, text: &str) -> Result<(), WriteError> {
        if *self.closed.borrow() {
            return Err(WriteError::Closed);
        }
        let mut tx = self.tx.lock().await;
        tx.send(WsMessage::Text(text.to_owned()))
            .await
            .map_err(to_write_error)
    }

    async fn close(&self) {
        // `send_replace` returns the previous value, so only the first caller
        // gets past this point.
        if self.closed.send_replace(true) {
            return;
        }
        let id = self.id;
        let result = timeout(CLOSE_TIMEOUT, async {
            let mut tx = self.tx.lock().await;
            tx.close().await
        })
        .await;
        match result {
            Ok(Ok(())) => debug!("connection {id}: WebSocket closed"),
            Ok(Err(e)) => debug!("connection {id}: error while closing WebSocket: {e}"),
            Err(_) => debug!("connection {id}: peer did not accept Close frame in time"),
        }
    }
}

fn to_write_error(e: WsError) -> WriteError {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => WriteError::Closed,
        other => WriteError::Transport(other.to_string()),
    }
}

// ── Read half ─────────────────────────────────────────────────────────────────

/// Read half of a WebSocket connection.
pub struct WsSource<S> {
    rx: SplitStream<WebSocketStream<S>>,
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl<S> MessageSource for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_payload(&mut self) -> Result<Vec<u8>, ReadError> {
        loop {
            let frame = tokio::select! {
                () = closed_signal(&mut self.closed) => return Err(ReadError::Closed),
                frame = self.rx.next() => frame,
            };

            match frame {
                None => return Err(ReadError::Closed),
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return Err(ReadError::Closed)
                }
                Some(Err(e)) => return Err(ReadError::Transport(e.to_string())),
                Some(Ok(WsMessage::Text(text))) => return Ok(text.into_bytes()),
                Some(Ok(WsMessage::Binary(data))) => return Ok(data),
                Some(Ok(WsMessage::Close(_))) => return Err(ReadError::Closed),
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {
                    continue
                }
            }
        }
    }
}

/// Resolves once the paired sink is closed or dropped.
async fn closed_signal(closed: &mut watch::Receiver<bool>) {
    while !*closed.borrow_and_update() {
        if closed.changed().await.is_err() {
            return;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;
    use tokio_tungstenite::tungstenite::protocol::Role;

    /// Builds a connected server/client WebSocket pair over an in-memory pipe,
    /// skipping the HTTP handshake.
    async fn ws_pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        (server, client)
    }

    #[tokio::test]
    async fn test_text_frame_yields_payload() {
        // Arrange
        let (server, mut client) = ws_pair().await;
        let (mut source, _sink) = split_connection(server);

        // Act
        client
            .send(WsMessage::Text(r#"{"message":"hi"}"#.to_string()))
            .await
            .unwrap();

        // Assert
        assert_eq!(source.next_payload().await.unwrap(), br#"{"message":"hi"}"#.to_vec());
    }

    #[tokio::test]
    async fn test_binary_frame_yields_payload() {
        let (server, mut client) = ws_pair().await;
        let (mut source, _sink) = split_connection(server);

        client
            .send(WsMessage::Binary(b"{}".to_vec()))
            .await
            .unwrap();

        assert_eq!(source.next_payload().await.unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn test_ping_is_skipped() {
        let (server, mut client) = ws_pair().await;
        let (mut source, _sink) = split_connection(server);

        client.send(WsMessage::Ping(vec![1, 2, 3])).await.unwrap();
        client.send(WsMessage::Text("{}".to_string())).await.unwrap();

        assert_eq!(source.next_payload().await.unwrap(), b"{}".to_vec());
    }

    #[tokio::test]
    async fn test_close_frame_reads_as_closed() {
        let (server, mut client) = ws_pair().await;
        let (mut source, _sink) = split_connection(server);

        client.close(None).await.unwrap();

        assert_eq!(source.next_payload().await, Err(ReadError::Closed));
    }

    #[tokio::test]
    async fn test_dropped_peer_reads_as_closed_or_transport_error() {
        let (server, client) = ws_pair().await;
        let (mut source, _sink) = split_connection(server);

        drop(client);

        let result = source.next_payload().await;
        assert!(result.is_err(), "an abrupt disconnect must end the read side");
    }

    #[tokio::test]
    async fn test_send_text_arrives_as_text_frame() {
        let (server, mut client) = ws_pair().await;
        let (_source, sink) = split_connection(server);

        sink.send_text(r#"{"message":"hi"}"#).await.unwrap();

        let frame = client.next().await.unwrap().unwrap();
        assert_eq!(frame, WsMessage::Text(r#"{"message":"hi"}"#.to_string()));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_later_writes() {
        let (server, _client) = ws_pair().await;
        let (_source, sink) = split_connection(server);

        sink.close().await;
        sink.close().await;

        assert_eq!(sink.send_text("{}").await, Err(WriteError::Closed));
    }

    #[tokio::test]
    async fn test_closing_sink_ends_pending_read() {
        // Arrange: the source is parked waiting for a frame that never comes.
        let (server, _client) = ws_pair().await;
        let (mut source, sink) = split_connection(server);
        let read = tokio::spawn(async move { source.next_payload().await });

        // Act
        sink.close().await;

        // Assert
        assert_eq!(read.await.unwrap(), Err(ReadError::Closed));
    }

    #[tokio::test]
    async fn test_each_connection_gets_a_distinct_id() {
        let (a, _ca) = ws_pair().await;
        let (b, _cb) = ws_pair().await;
        let (_sa, sink_a) = split_connection(a);
        let (_sb, sink_b) = split_connection(b);
        assert_ne!(sink_a.id(), sink_b.id());
    }
}
