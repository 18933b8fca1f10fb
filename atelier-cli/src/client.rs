//! WebSocket client for one-shot bridge commands

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use atelier_protocol::{decode, encode_text, Envelope};
use atelier_utils::{AtelierError, Result};

/// Timeout for the connection handshake
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Check that `addr` is a WebSocket URL with a host
pub fn parse_addr(addr: &str) -> Result<Url> {
    let url = Url::parse(addr)
        .map_err(|e| AtelierError::Connection(format!("Invalid bridge URL '{}': {}", addr, e)))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(AtelierError::Connection(format!(
                "Unsupported scheme '{}' (expected ws:// or wss://)",
                other
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(AtelierError::Connection("Missing host in bridge URL".into()));
    }

    Ok(url)
}

/// Bridge connection
pub struct Client {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Client {
    /// Connect to the bridge at `addr`
    pub async fn connect(addr: &str) -> Result<Self> {
        let url = parse_addr(addr)?;

        let (ws, _) = timeout(CONNECT_TIMEOUT, connect_async(url.as_str()))
            .await
            .map_err(|_| AtelierError::Connection(format!("Timed out connecting to {}", url)))?
            .map_err(|e| AtelierError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        debug!("Connected to {}", url);
        Ok(Self { ws })
    }

    /// Send one envelope as a text frame
    pub async fn send(&mut self, envelope: &Envelope) -> Result<()> {
        let text = encode_text(envelope).map_err(|e| AtelierError::Protocol(e.to_string()))?;
        self.ws
            .send(Message::text(text))
            .await
            .map_err(|e| AtelierError::Connection(format!("Failed to send: {}", e)))
    }

    /// Call `on_envelope` for every envelope received within `window`
    ///
    /// Undecodable frames are skipped. Returns early if the bridge closes
    /// the connection.
    pub async fn watch<F>(&mut self, window: Duration, mut on_envelope: F) -> Result<()>
    where
        F: FnMut(Envelope),
    {
        let deadline = Instant::now() + window;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let msg = match timeout(remaining, self.ws.next()).await {
                Err(_) => return Ok(()),
                Ok(None) => return Err(AtelierError::ConnectionClosed),
                Ok(Some(Err(e))) => {
                    return Err(AtelierError::Connection(format!("Failed to receive: {}", e)))
                }
                Ok(Some(Ok(msg))) => msg,
            };

            let bytes = match &msg {
                Message::Text(text) => text.as_str().as_bytes(),
                Message::Binary(data) => data.as_ref(),
                Message::Close(_) => return Err(AtelierError::ConnectionClosed),
                _ => continue,
            };
            match decode(bytes) {
                Ok(envelope) => on_envelope(envelope),
                Err(e) => debug!("Skipping frame: {}", e),
            }
        }
    }

    /// Close the connection, flushing queued frames first
    pub async fn close(mut self) -> Result<()> {
        self.ws
            .close(None)
            .await
            .map_err(|e| AtelierError::Connection(format!("Failed to close: {}", e)))
    }
}
