//! Socket.IO endpoint derivation.
//!
//! The backend is configured by its HTTP base URL (the same value the REST
//! endpoints use). The WebSocket endpoint lives under `/socket.io/` on the
//! same host.

/// Engine.IO protocol revision spoken by this client.
pub const ENGINE_IO_VERSION: u8 = 4;

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// WebSocket URL for a backend base URL.
///
/// `http` maps to `ws` and `https` to `wss`; a URL that already uses a
/// WebSocket scheme keeps it, and a bare `host:port` is treated as `http`.
/// Any path on the base URL is kept as a prefix.
///
/// ```
/// use memoai_proto::endpoint::websocket_url;
///
/// assert_eq!(
///     websocket_url("http://localhost:8000"),
///     "ws://localhost:8000/socket.io/?EIO=4&transport=websocket"
/// );
/// ```
pub fn websocket_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    let (scheme, rest) = match trimmed.split_once("://") {
        Some(("https" | "wss", rest)) => ("wss", rest),
        Some((_, rest)) => ("ws", rest),
        None => ("ws", trimmed),
    };
    format!("{scheme}://{rest}/socket.io/?EIO={ENGINE_IO_VERSION}&transport=websocket")
}
