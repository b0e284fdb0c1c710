//! In-process connection pair for tests and simulations

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::error::{BzzEthError, BzzEthResult};
use crate::message::Message;
use crate::transport::{Link, ProtocolConnection};
use crate::types::{Capability, ConnectionInfo, DisconnectReason, PeerId};

/// One end of an in-memory connection.
///
/// Both ends share a single link: a disconnect from either side closes
/// the connection for both, and the first reason given is kept. Dropping
/// either end closes the link without a reason.
pub struct MemoryConnection {
    info: ConnectionInfo,
    outbound: mpsc::UnboundedSender<Message>,
    inbound: Mutex<mpsc::UnboundedReceiver<Message>>,
    received: AtomicUsize,
    link: Arc<Link>,
}

impl MemoryConnection {
    /// Create a connected pair.
    ///
    /// The first end sees `remote` with `remote_caps`; the second end sees
    /// `local` with `local_caps`.
    pub fn pipe(
        local: PeerId,
        local_caps: Vec<Capability>,
        remote: PeerId,
        remote_caps: Vec<Capability>,
    ) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let link = Arc::new(Link::new());

        let a = Self {
            info: ConnectionInfo::new(remote, remote_caps),
            outbound: a_tx,
            inbound: Mutex::new(a_rx),
            received: AtomicUsize::new(0),
            link: link.clone(),
        };
        let b = Self {
            info: ConnectionInfo::new(local, local_caps),
            outbound: b_tx,
            inbound: Mutex::new(b_rx),
            received: AtomicUsize::new(0),
            link,
        };
        (a, b)
    }

    /// Reason the link was closed with, if closed with one
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.link.reason()
    }

    /// Number of messages this end has received so far
    pub fn received_count(&self) -> usize {
        self.received.load(Ordering::SeqCst)
    }

    /// Whether a message is waiting to be received on this end
    pub async fn has_pending(&self) -> bool {
        !self.inbound.lock().await.is_empty()
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.link.close(None);
    }
}

#[async_trait]
impl ProtocolConnection for MemoryConnection {
    fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    async fn send(&self, msg: Message) -> BzzEthResult<()> {
        if self.link.is_closed() {
            return Err(BzzEthError::Disconnected(self.link.reason()));
        }
        self.outbound
            .send(msg)
            .map_err(|_| BzzEthError::ChannelClosed)
    }

    async fn recv(&self) -> BzzEthResult<Message> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            biased;
            msg = inbound.recv() => match msg {
                Some(msg) => {
                    self.received.fetch_add(1, Ordering::SeqCst);
                    Ok(msg)
                }
                None => Err(BzzEthError::Disconnected(self.link.reason())),
            },
            _ = self.link.closed() => Err(BzzEthError::Disconnected(self.link.reason())),
        }
    }

    async fn disconnect(&self, reason: Option<DisconnectReason>) {
        self.link.close(reason);
    }

    async fn closed(&self) {
        self.link.closed().await
    }

    fn is_closed(&self) -> bool {
        self.link.is_closed()
    }
}
