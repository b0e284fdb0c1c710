//! Per-connection protocol session
//!
//! ```text
//! Connected -> Classifying -> Rejected ----------------------> Terminated
//!                          \-> Handshaking -> Failed --------> Terminated
//!                                          \-> Registered ---> Terminated
//! ```
//!
//! Nothing is retried. A registered session idles until the service shuts
//! down or the transport reports the link gone, then deregisters.

use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::classifier::PeerClassifier;
use crate::config::BzzEthConfig;
use crate::error::BzzEthResult;
use crate::handshake::perform_handshake;
use crate::message::Handshake;
use crate::peer::{Peer, PeerRegistry};
use crate::shutdown::ShutdownSignal;
use crate::transport::ProtocolConnection;
use crate::types::{DisconnectReason, PeerId};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionState {
    /// Transport handed over a live connection
    Connected,
    /// Classifier is running
    Classifying,
    /// Remote is overlay-native, bridge not applicable
    Rejected,
    /// Handshake in flight
    Handshaking,
    /// Handshake failed
    Failed,
    /// Peer registered, idling
    Registered,
    /// Session over
    Terminated,
}

/// How a session that didn't fail ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Classifier rejected the peer; disconnected with "protocol returned"
    Rejected,
    /// Service shut down while the peer was registered
    Shutdown,
    /// Transport lost the link while the peer was registered
    Disconnected,
}

/// Keeps a peer in the registry for as long as it lives
struct Registration<'a> {
    registry: &'a PeerRegistry,
    peer: Arc<Peer>,
}

impl<'a> Registration<'a> {
    fn new(registry: &'a PeerRegistry, peer: Arc<Peer>) -> Self {
        registry.add(peer.clone());
        Self { registry, peer }
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.registry.remove_if_same(&self.peer) {
            debug!("Peer {} removed", self.peer.id());
        }
    }
}

/// One run of the protocol over one connection
pub(crate) struct Session<'a> {
    conn: Arc<dyn ProtocolConnection>,
    config: &'a BzzEthConfig,
    classifier: &'a dyn PeerClassifier,
    registry: &'a PeerRegistry,
    shutdown: &'a ShutdownSignal,
    state: SessionState,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        conn: Arc<dyn ProtocolConnection>,
        config: &'a BzzEthConfig,
        classifier: &'a dyn PeerClassifier,
        registry: &'a PeerRegistry,
        shutdown: &'a ShutdownSignal,
    ) -> Self {
        Self {
            conn,
            config,
            classifier,
            registry,
            shutdown,
            state: SessionState::Connected,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    fn peer_id(&self) -> PeerId {
        self.conn.info().peer_id
    }

    fn transition(&mut self, next: SessionState) {
        trace!("Session {}: {:?} -> {:?}", self.peer_id(), self.state, next);
        self.state = next;
    }

    /// Drive the session to completion
    pub(crate) async fn run(&mut self) -> BzzEthResult<SessionOutcome> {
        let peer_id = self.peer_id();

        self.transition(SessionState::Classifying);
        if self.classifier.is_overlay_peer(self.conn.info()) {
            self.transition(SessionState::Rejected);
            debug!("Peer {} is an overlay node, not running bzzeth", peer_id);
            self.conn
                .disconnect(Some(DisconnectReason::ProtocolReturned))
                .await;
            self.transition(SessionState::Terminated);
            return Ok(SessionOutcome::Rejected);
        }

        self.transition(SessionState::Handshaking);
        let local = Handshake::new(self.config.serve_headers);
        let remote = match perform_handshake(
            self.conn.as_ref(),
            local,
            self.config.handshake_timeout(),
        )
        .await
        {
            Ok(remote) => remote,
            Err(e) => {
                self.transition(SessionState::Failed);
                warn!("Handshake with peer {} failed: {}", peer_id, e);
                self.conn.disconnect(Some(e.disconnect_reason())).await;
                self.transition(SessionState::Terminated);
                return Err(e);
            }
        };

        let peer = Arc::new(Peer::new(peer_id, remote.serve_headers, self.conn.clone()));
        let registration = Registration::new(self.registry, peer);
        self.transition(SessionState::Registered);
        info!(
            "bzzeth peer {} registered (serve_headers={})",
            peer_id, remote.serve_headers
        );

        let outcome = tokio::select! {
            _ = self.shutdown.wait() => SessionOutcome::Shutdown,
            _ = self.conn.closed() => SessionOutcome::Disconnected,
        };
        drop(registration);

        match outcome {
            SessionOutcome::Shutdown => {
                debug!("Session with peer {} stopping on shutdown", peer_id);
                self.conn.disconnect(None).await;
            }
            _ => debug!("Peer {} dropped the connection", peer_id),
        }
        self.transition(SessionState::Terminated);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::CapabilityClassifier;
    use crate::error::BzzEthError;
    use crate::memory::MemoryConnection;
    use crate::message::Message;
    use crate::types::Capability;
    use bytes::Bytes;
    use std::time::Duration;

    fn pipe(caps: Vec<Capability>) -> (Arc<MemoryConnection>, MemoryConnection) {
        let (local, remote) = MemoryConnection::pipe(
            PeerId::from_bytes([1; 32]),
            vec![Capability::new("bzzeth", 1)],
            PeerId::from_bytes([2; 32]),
            caps,
        );
        (Arc::new(local), remote)
    }

    #[tokio::test]
    async fn test_rejected_session_sends_nothing() {
        let config = BzzEthConfig::default();
        let classifier = CapabilityClassifier::default();
        let registry = PeerRegistry::new();
        let shutdown = ShutdownSignal::new();
        let (conn, remote) = pipe(vec![Capability::new("bzz", 9)]);

        let mut session = Session::new(conn, &config, &classifier, &registry, &shutdown);
        let outcome = session.run().await.unwrap();

        assert_eq!(outcome, SessionOutcome::Rejected);
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(remote.disconnect_reason(), Some(DisconnectReason::ProtocolReturned));
        assert!(!remote.has_pending().await);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failed_handshake_disconnects_with_violation() {
        let config = BzzEthConfig::default();
        let classifier = CapabilityClassifier::default();
        let registry = PeerRegistry::new();
        let shutdown = ShutdownSignal::new();
        let (conn, remote) = pipe(vec![]);

        remote
            .send(Message::new(1, Bytes::from_static(b"{}")))
            .await
            .unwrap();

        let mut session = Session::new(conn, &config, &classifier, &registry, &shutdown);
        let err = session.run().await.unwrap_err();

        assert!(matches!(err, BzzEthError::ProtocolViolation(_)));
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(remote.disconnect_reason(), Some(DisconnectReason::ProtocolViolation));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_registered_until_remote_drops() {
        let config = BzzEthConfig::default();
        let classifier = CapabilityClassifier::default();
        let registry = PeerRegistry::new();
        let shutdown = ShutdownSignal::new();
        let (conn, remote) = pipe(vec![]);

        remote
            .send(Message::from_typed(&Handshake::new(true)).unwrap())
            .await
            .unwrap();

        let mut session = Session::new(conn, &config, &classifier, &registry, &shutdown);
        let run = session.run();
        tokio::pin!(run);

        let peer_id = PeerId::from_bytes([2; 32]);
        let registered = async {
            while !registry.contains(&peer_id) {
                tokio::task::yield_now().await;
            }
        };
        tokio::select! {
            _ = &mut run => panic!("session ended before registering"),
            _ = tokio::time::timeout(Duration::from_secs(1), registered) => {}
        }
        assert!(registry.get(&peer_id).unwrap().serves_headers());

        remote.disconnect(Some(DisconnectReason::Requested)).await;
        let outcome = run.await.unwrap();
        assert_eq!(outcome, SessionOutcome::Disconnected);
        assert!(registry.is_empty());
        assert!(!shutdown.is_fired());
    }

    #[tokio::test]
    async fn test_remote_end_dropped_while_registered() {
        let config = BzzEthConfig::default();
        let classifier = CapabilityClassifier::default();
        let registry = PeerRegistry::new();
        let shutdown = ShutdownSignal::new();
        let (conn, remote) = pipe(vec![]);

        remote
            .send(Message::from_typed(&Handshake::new(false)).unwrap())
            .await
            .unwrap();

        let mut session = Session::new(conn, &config, &classifier, &registry, &shutdown);
        let run = session.run();
        tokio::pin!(run);

        let peer_id = PeerId::from_bytes([2; 32]);
        let registered = async {
            while !registry.contains(&peer_id) {
                tokio::task::yield_now().await;
            }
        };
        tokio::select! {
            _ = &mut run => panic!("session ended before registering"),
            _ = tokio::time::timeout(Duration::from_secs(1), registered) => {}
        }

        drop(remote);
        let outcome = tokio::time::timeout(Duration::from_secs(1), run)
            .await
            .expect("session still idle after remote drop")
            .unwrap();
        assert_eq!(outcome, SessionOutcome::Disconnected);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_session_deregisters() {
        let config = BzzEthConfig::default();
        let classifier = CapabilityClassifier::default();
        let registry = PeerRegistry::new();
        let shutdown = ShutdownSignal::new();
        let (conn, remote) = pipe(vec![]);

        remote
            .send(Message::from_typed(&Handshake::new(false)).unwrap())
            .await
            .unwrap();

        {
            let mut session = Session::new(conn, &config, &classifier, &registry, &shutdown);
            let run = session.run();
            // Never completes: nobody fires shutdown or closes the link.
            let _ = tokio::time::timeout(Duration::from_millis(50), run).await;
        }
        assert!(registry.is_empty());
    }
}
