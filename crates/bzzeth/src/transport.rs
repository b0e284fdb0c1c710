//! The seam between the protocol and the transport that carries it

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::BzzEthResult;
use crate::message::Message;
use crate::types::{ConnectionInfo, DisconnectReason};

/// One multiplexed protocol connection, as handed to the protocol by the
/// transport. Sends and receives are already framed and typed by code.
#[async_trait]
pub trait ProtocolConnection: Send + Sync {
    /// Remote identity and advertised capabilities
    fn info(&self) -> &ConnectionInfo;

    /// Send a message to the remote
    async fn send(&self, msg: Message) -> BzzEthResult<()>;

    /// Wait for the next message from the remote
    async fn recv(&self) -> BzzEthResult<Message>;

    /// Tear the connection down. Only the first call's reason is kept.
    async fn disconnect(&self, reason: Option<DisconnectReason>);

    /// Resolves once the link is down, whoever closed it
    async fn closed(&self);

    /// Whether the link is down
    fn is_closed(&self) -> bool;
}

/// Link state shared by both halves of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LinkState {
    Open,
    Closed(Option<DisconnectReason>),
}

/// Open/closed flag with wakeups, closed at most once
#[derive(Debug)]
pub(crate) struct Link {
    state: watch::Sender<LinkState>,
}

impl Link {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(LinkState::Open);
        Self { state }
    }

    /// Close the link. Returns false if it was already closed.
    pub(crate) fn close(&self, reason: Option<DisconnectReason>) -> bool {
        self.state.send_if_modified(|state| match state {
            LinkState::Open => {
                *state = LinkState::Closed(reason);
                true
            }
            LinkState::Closed(_) => false,
        })
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(*self.state.borrow(), LinkState::Closed(_))
    }

    pub(crate) fn reason(&self) -> Option<DisconnectReason> {
        match &*self.state.borrow() {
            LinkState::Closed(reason) => reason.clone(),
            LinkState::Open => None,
        }
    }

    pub(crate) async fn closed(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in self, so wait_for cannot fail here.
        let _ = rx
            .wait_for(|state| matches!(state, LinkState::Closed(_)))
            .await;
    }
}
