//! Connection Registry
//!
//! Tracks open bridge connections and fans envelopes out to them. Each
//! connection is represented by the sending half of its outbound queue; the
//! connection's writer task drains the queue in order, which gives FIFO
//! delivery per connection.
//!
//! Sends never block and never fail loudly. A closed or full queue counts as
//! a non-delivery; the entry itself is only removed when the transport
//! reports the close and calls [`ConnectionRegistry::unregister`].

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tracing::{debug, error, warn};

use atelier_protocol::{encode_text, Envelope};

/// Encoded envelope queued for a connection
pub type Frame = Utf8Bytes;

/// Opaque connection handle, not reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a ConnectionId from a raw value (mainly for testing)
    #[cfg(test)]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Conn({})", self.0)
    }
}

/// Entry for an open connection
pub struct ConnectionEntry {
    /// Outbound queue of this connection
    pub sender: mpsc::Sender<Frame>,
    /// Remote address, when the transport knows it
    pub peer: Option<SocketAddr>,
    pub connected_at: Instant,
}

impl std::fmt::Debug for ConnectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEntry")
            .field("peer", &self.peer)
            .field("sender_closed", &self.sender.is_closed())
            .finish()
    }
}

/// Registry of all open connections
///
/// Safe for concurrent use from every connection task and tool task.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection by its outbound queue
    pub fn register(&self, sender: mpsc::Sender<Frame>, peer: Option<SocketAddr>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst));

        self.connections.insert(
            id,
            ConnectionEntry {
                sender,
                peer,
                connected_at: Instant::now(),
            },
        );
        debug!("Registered {} ({:?})", id, peer);

        id
    }

    /// Remove a connection; calling it again is a no-op
    ///
    /// Returns `true` if the connection was present.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        match self.connections.remove(&id) {
            Some((_, entry)) => {
                debug!(
                    "Unregistered {} after {:?}",
                    id,
                    entry.connected_at.elapsed()
                );
                true
            }
            None => false,
        }
    }

    /// Whether `id` is registered and its queue still accepts frames
    pub fn is_open(&self, id: ConnectionId) -> bool {
        self.connections
            .get(&id)
            .map(|entry| !entry.sender.is_closed())
            .unwrap_or(false)
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Ids of all registered connections
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    /// Send an envelope to exactly one connection
    ///
    /// Returns `false` (and logs) if the connection is gone or cannot accept
    /// the frame.
    pub fn unicast(&self, id: ConnectionId, envelope: &Envelope) -> bool {
        let Some(frame) = encode_frame(envelope) else {
            return false;
        };
        let delivered = self.try_deliver(id, frame);
        if !delivered {
            debug!("Unicast of {} to {} not delivered", envelope.msg_type, id);
        }
        delivered
    }

    /// Send an envelope to every open connection except `exclude`
    ///
    /// The envelope is encoded once. Returns the number of connections whose
    /// queue accepted the frame.
    pub fn broadcast(&self, envelope: &Envelope, exclude: Option<ConnectionId>) -> usize {
        let targets: Vec<ConnectionId> = self
            .connections
            .iter()
            .map(|entry| *entry.key())
            .filter(|id| Some(*id) != exclude)
            .collect();

        if targets.is_empty() {
            return 0;
        }

        let Some(frame) = encode_frame(envelope) else {
            return 0;
        };

        let delivered = targets
            .into_iter()
            .filter(|id| self.try_deliver(*id, frame.clone()))
            .count();

        debug!(
            "Broadcast {} to {} connection(s) (exclude {:?})",
            envelope.msg_type, delivered, exclude
        );
        delivered
    }

    fn try_deliver(&self, id: ConnectionId, frame: Frame) -> bool {
        let sender = match self.connections.get(&id) {
            Some(entry) => entry.sender.clone(),
            None => return false,
        };

        match sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("{} queue closed, skipping", id);
                false
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("{} queue full, frame dropped", id);
                false
            }
        }
    }
}

fn encode_frame(envelope: &Envelope) -> Option<Frame> {
    match encode_text(envelope) {
        Ok(text) => Some(Frame::from(text)),
        Err(e) => {
            error!("Failed to encode {}: {}", envelope.msg_type, e);
            None
        }
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connection_count", &self.connections.len())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish()
    }
}
