//! Peer classification
//!
//! Decides, before any bzzeth message is sent, whether the remote is an
//! overlay-native Swarm node. Swarm nodes talk to each other over their own
//! stack, so the bridge only runs against plain Eth nodes. The answer can't
//! come from bzzeth traffic itself; it comes from the capabilities the remote
//! advertised during the transport's handshake.

use crate::types::ConnectionInfo;

/// Capability advertised by overlay-native Swarm nodes
pub const OVERLAY_CAPABILITY: &str = "bzz";

/// Decides whether a connection belongs to the overlay network.
///
/// `true` means the bridge must not run on this connection.
pub trait PeerClassifier: Send + Sync {
    /// Whether the remote is an overlay-native peer
    fn is_overlay_peer(&self, info: &ConnectionInfo) -> bool;
}

impl<F> PeerClassifier for F
where
    F: Fn(&ConnectionInfo) -> bool + Send + Sync,
{
    fn is_overlay_peer(&self, info: &ConnectionInfo) -> bool {
        self(info)
    }
}

/// Default classifier: a peer is overlay-native if it advertised the
/// overlay capability, whatever the version.
#[derive(Debug, Clone)]
pub struct CapabilityClassifier {
    capability: String,
}

impl CapabilityClassifier {
    /// Classify by the given capability name
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
        }
    }

    /// The capability name this classifier looks for
    pub fn capability(&self) -> &str {
        &self.capability
    }
}

impl Default for CapabilityClassifier {
    fn default() -> Self {
        Self::new(OVERLAY_CAPABILITY)
    }
}

impl PeerClassifier for CapabilityClassifier {
    fn is_overlay_peer(&self, info: &ConnectionInfo) -> bool {
        info.has_capability(&self.capability)
    }
}
