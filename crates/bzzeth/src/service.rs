//! bzzeth service

use crate::classifier::{CapabilityClassifier, PeerClassifier};
use crate::config::BzzEthConfig;
use crate::error::BzzEthResult;
use crate::message::{ProtocolSpec, PROTOCOL_LENGTH, PROTOCOL_NAME, PROTOCOL_VERSION};
use crate::peer::{Peer, PeerRegistry};
use crate::session::{Session, SessionOutcome};
use crate::shutdown::ShutdownSignal;
use crate::transport::ProtocolConnection;
use crate::types::{Capability, PeerId};
use std::sync::Arc;
use tracing::info;

/// Process-wide protocol state: the peer registry and the shutdown signal.
///
/// Cloning is cheap and shares state, so the transport can hand a clone to
/// each connection task.
#[derive(Clone)]
pub struct BzzEth {
    /// Configuration
    config: Arc<BzzEthConfig>,
    /// Overlay-peer predicate
    classifier: Arc<dyn PeerClassifier>,
    /// Registered peers
    peers: Arc<PeerRegistry>,
    /// Shutdown signal
    shutdown: ShutdownSignal,
}

impl BzzEth {
    /// Create a service classifying peers by the configured overlay capability
    pub fn new(config: BzzEthConfig) -> Self {
        let classifier = CapabilityClassifier::new(config.overlay_capability.clone());
        Self::with_classifier(config, Arc::new(classifier))
    }

    /// Create a service with a custom classifier
    pub fn with_classifier(config: BzzEthConfig, classifier: Arc<dyn PeerClassifier>) -> Self {
        Self {
            config: Arc::new(config),
            classifier,
            peers: Arc::new(PeerRegistry::new()),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Protocol description for the transport
    pub fn protocol(&self) -> ProtocolSpec {
        ProtocolSpec {
            name: PROTOCOL_NAME,
            version: PROTOCOL_VERSION,
            length: PROTOCOL_LENGTH,
            max_message_size: self.config.max_message_size,
        }
    }

    /// Capability to advertise in the transport's handshake
    pub fn capability(&self) -> Capability {
        Capability::new(PROTOCOL_NAME, PROTOCOL_VERSION)
    }

    /// Configuration
    pub fn config(&self) -> &BzzEthConfig {
        &self.config
    }

    /// Run the protocol on one connection. Called by the transport once
    /// per accepted connection; returns when the session is over.
    pub async fn run(&self, conn: Arc<dyn ProtocolConnection>) -> BzzEthResult<SessionOutcome> {
        let mut session = Session::new(
            conn,
            &self.config,
            self.classifier.as_ref(),
            &self.peers,
            &self.shutdown,
        );
        session.run().await
    }

    /// Get a registered peer
    pub fn get_peer(&self, peer_id: &PeerId) -> Option<Arc<Peer>> {
        self.peers.get(peer_id)
    }

    /// The peer registry
    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Get peer count
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Signal every session to wind down. Only the first call has effect.
    pub fn stop(&self) -> bool {
        let fired = self.shutdown.fire();
        if fired {
            info!("bzzeth stopping, {} peers registered", self.peers.len());
        }
        fired
    }

    /// Check if stopped
    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_fired()
    }
}

impl std::fmt::Debug for BzzEth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BzzEth")
            .field("config", &self.config)
            .field("peers", &self.peers.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl Default for BzzEth {
    fn default() -> Self {
        Self::new(BzzEthConfig::default())
    }
}
