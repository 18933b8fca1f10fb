//! WebSocket transport for the bridge channel

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::bridge::BridgeState;
use crate::registry::Frame;

/// How long a closing connection may spend flushing queued frames
const WRITER_DRAIN: Duration = Duration::from_secs(2);

/// Run the WebSocket accept loop
pub async fn run_accept_loop(
    listener: TcpListener,
    state: Arc<BridgeState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("Bridge listening on ws://{}", addr);
    }

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer_addr)) => {
                        debug!("New connection from {}", peer_addr);
                        let state_clone = Arc::clone(&state);
                        tokio::spawn(async move {
                            handle_connection(stream, peer_addr, state_clone).await;
                        });
                    }
                    Err(e) => {
                        error!("Bridge accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping bridge accept loop");
                break;
            }
        }
    }
}

/// Serve one client from handshake to close
///
/// Outbound frames go through a bounded queue drained by a writer task, so a
/// slow client only ever fills its own queue.
pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: Arc<BridgeState>) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };
    let (mut ws_sink, mut ws_source) = ws.split();

    let queue = state.config.load().bridge.outbound_queue;
    let (tx, mut rx) = mpsc::channel::<Frame>(queue);
    let mut shutdown_rx = state.subscribe_shutdown();
    let id = state.registry.register(tx, Some(peer));
    info!("{} connected from {}", id, peer);

    let mut writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(frame)).await {
                debug!("{} write failed: {}", id, e);
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    loop {
        tokio::select! {
            msg = ws_source.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    state.router.route_frame(Some(id), text.as_str().as_bytes());
                }
                Some(Ok(Message::Binary(data))) => {
                    state.router.route_frame(Some(id), &data);
                }
                Some(Ok(Message::Close(_))) | None => break,
                // Ping/pong is answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("{} read error: {}", id, e);
                    break;
                }
            },
            _ = shutdown_rx.recv() => {
                debug!("{} closing for shutdown", id);
                break;
            }
        }
    }

    // Dropping the registry entry drops the queue sender and ends the writer
    state.registry.unregister(id);
    if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }
    info!("{} disconnected", id);
}
