//! Peer management

use crate::error::BzzEthResult;
use crate::message::Message;
use crate::transport::ProtocolConnection;
use crate::types::PeerId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// A handshaken bzzeth peer
pub struct Peer {
    id: PeerId,
    serve_headers: bool,
    conn: Arc<dyn ProtocolConnection>,
    connected_at: Instant,
}

impl Peer {
    /// Create a new peer from a completed handshake
    pub fn new(id: PeerId, serve_headers: bool, conn: Arc<dyn ProtocolConnection>) -> Self {
        Self {
            id,
            serve_headers,
            conn,
            connected_at: Instant::now(),
        }
    }

    /// Peer ID
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// Whether the remote advertised it serves headers
    pub fn serves_headers(&self) -> bool {
        self.serve_headers
    }

    /// Outbound handle to the peer's connection
    pub fn connection(&self) -> &Arc<dyn ProtocolConnection> {
        &self.conn
    }

    /// When the handshake completed
    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    /// Send a message to this peer
    pub async fn send(&self, msg: Message) -> BzzEthResult<()> {
        self.conn.send(msg).await
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("serve_headers", &self.serve_headers)
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

/// Registry of live, handshaken peers
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<HashMap<PeerId, Arc<Peer>>>,
}

impl PeerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a peer, replacing any entry with the same ID
    pub fn add(&self, peer: Arc<Peer>) {
        self.peers.write().insert(peer.id(), peer);
    }

    /// Remove a peer. Absent IDs are a no-op.
    pub fn remove(&self, peer_id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.write().remove(peer_id)
    }

    /// Remove a peer only if the entry is this exact peer.
    ///
    /// A session uses this on exit so it never evicts a newer session
    /// that registered under the same ID.
    pub fn remove_if_same(&self, peer: &Arc<Peer>) -> bool {
        let mut peers = self.peers.write();
        match peers.get(&peer.id()) {
            Some(current) if Arc::ptr_eq(current, peer) => {
                peers.remove(&peer.id());
                true
            }
            _ => false,
        }
    }

    /// Get a peer
    pub fn get(&self, peer_id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.read().get(peer_id).cloned()
    }

    /// Check if peer exists
    pub fn contains(&self, peer_id: &PeerId) -> bool {
        self.peers.read().contains_key(peer_id)
    }

    /// Get peer count
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Whether no peers are registered
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    /// Get all peer IDs
    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.read().keys().copied().collect()
    }

    /// Peers that advertised they serve headers
    pub fn header_serving_peers(&self) -> Vec<Arc<Peer>> {
        self.peers
            .read()
            .values()
            .filter(|p| p.serves_headers())
            .cloned()
            .collect()
    }
}
