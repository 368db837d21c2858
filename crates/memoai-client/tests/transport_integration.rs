//! Integration tests for the client WebSocket transport.
//!
//! These tests run a minimal Engine.IO speaking WebSocket server on loopback
//! and drive the real transport against it.

#![cfg(feature = "transport")]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use memoai_client::transport::{self, TransportError};
use memoai_proto::{Packet, endpoint::websocket_url};
use serde_json::json;
use tokio::{net::TcpListener, time::timeout};
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

const OPEN: &str = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":120000,"maxPayload":1000000}"#;

/// Start a one-shot server that performs the handshake, sends one chat
/// chunk, and closes. Returns the HTTP base URL.
async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = accept_async(stream).await.unwrap();

        socket.send(WsMessage::Text(OPEN.to_string())).await.unwrap();

        // Namespace connect from the client
        let Some(Ok(WsMessage::Text(frame))) = socket.next().await else {
            panic!("expected namespace connect");
        };
        assert_eq!(frame, "40");

        socket.send(WsMessage::Text(r#"40{"sid":"ns1"}"#.to_string())).await.unwrap();
        socket
            .send(WsMessage::Text(r#"42["chat_chunk",{"chunk":"Hi"}]"#.to_string()))
            .await
            .unwrap();
        socket.close(None).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn transport_carries_packets_both_ways() {
    let base = start_server().await;
    let mut conn = transport::connect(&websocket_url(&base)).await.unwrap();

    let open = timeout(Duration::from_secs(5), conn.from_server.recv()).await.unwrap().unwrap();
    assert!(matches!(open, Ok(Packet::Open(ref handshake)) if handshake.sid == "abc"));

    conn.to_server.send(Packet::connect()).await.unwrap();

    let ack = timeout(Duration::from_secs(5), conn.from_server.recv()).await.unwrap().unwrap();
    assert!(matches!(ack, Ok(Packet::Connect { .. })));

    let chunk = timeout(Duration::from_secs(5), conn.from_server.recv()).await.unwrap().unwrap();
    assert_eq!(chunk, Ok(Packet::event("chat_chunk", json!({"chunk": "Hi"}))));

    let closed = timeout(Duration::from_secs(5), conn.from_server.recv()).await.unwrap().unwrap();
    assert!(matches!(closed, Err(TransportError::Closed(_))));
}

#[tokio::test]
async fn connect_fails_without_server() {
    // Bind and drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = transport::connect(&websocket_url(&format!("http://{addr}"))).await;
    assert!(matches!(result, Err(TransportError::Connection(_))));
}
