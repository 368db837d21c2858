//! WebSocket transport for the client.
//!
//! Provides [`ConnectedClient`] which carries Engine.IO text frames over a
//! WebSocket. This is a thin layer that only encodes, decodes and moves
//! packets; protocol logic remains in the Sans-IO [`Client`](crate::Client).

use futures_util::{SinkExt, StreamExt};
use memoai_proto::Packet;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message as WsMessage,
};

/// Capacity of the packet channels in each direction.
const CHANNEL_CAPACITY: usize = 64;

/// Transport errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be opened.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Socket failed while open.
    #[error("stream error: {0}")]
    Stream(String),

    /// Server closed the socket.
    #[error("closed by server: {0}")]
    Closed(String),
}

/// Handle to a live WebSocket transport.
///
/// Packets are sent and received via the channels; an internal task handles
/// the socket I/O. The receiving side yields `Err` once, when the socket
/// fails or the server closes it, and then ends.
pub struct ConnectedClient {
    /// Send packets to the server.
    pub to_server: mpsc::Sender<Packet>,
    /// Receive packets from the server.
    pub from_server: mpsc::Receiver<Result<Packet, TransportError>>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Stop the connection. No further packets or errors are delivered.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ConnectedClient {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Open a WebSocket to an Engine.IO endpoint.
///
/// `url` is the full WebSocket URL, as produced by
/// [`websocket_url`](memoai_proto::endpoint::websocket_url).
///
/// # Errors
///
/// - `TransportError::Connection` if the TCP, TLS or WebSocket handshake
///   fails
pub async fn connect(url: &str) -> Result<ConnectedClient, TransportError> {
    let (socket, _response) =
        connect_async(url).await.map_err(|e| TransportError::Connection(e.to_string()))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<Packet>(CHANNEL_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let handle = tokio::spawn(run_connection(socket, to_server_rx, from_server_tx));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Run the connection, bridging between channels and the socket.
async fn run_connection(
    socket: Socket,
    mut to_server: mpsc::Receiver<Packet>,
    from_server: mpsc::Sender<Result<Packet, TransportError>>,
) {
    let (mut sink, mut stream) = socket.split();

    let outcome = loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(packet) = outgoing else {
                    // Handle dropped: close politely and stop.
                    let _ = sink.close().await;
                    return;
                };
                let text = match packet.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping unencodable packet");
                        continue;
                    },
                };
                if let Err(e) = sink.send(WsMessage::Text(text)).await {
                    break TransportError::Stream(e.to_string());
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => match Packet::decode(&text) {
                    Ok(packet) => {
                        if from_server.send(Ok(packet)).await.is_err() {
                            return;
                        }
                    },
                    Err(e) => tracing::warn!(error = %e, frame = %text, "undecodable frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.into_owned())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "no reason given".to_string());
                    break TransportError::Closed(reason);
                },
                Some(Ok(WsMessage::Binary(_))) => {
                    tracing::warn!("ignoring binary frame");
                },
                // Ping/pong frames are answered by tungstenite itself.
                Some(Ok(_)) => {},
                Some(Err(e)) => break TransportError::Stream(e.to_string()),
                None => break TransportError::Closed("stream ended".to_string()),
            },
        }
    };

    tracing::debug!(error = %outcome, "transport finished");
    let _ = from_server.send(Err(outcome)).await;
}
