//! Framed connection over a byte stream

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace};

use crate::codec::MessageCodec;
use crate::error::{BzzEthError, BzzEthResult};
use crate::message::{Message, MessageType};
use crate::transport::{Link, ProtocolConnection};
use crate::types::{ConnectionInfo, DisconnectReason};

const CHANNEL_CAPACITY: usize = 256;

/// A protocol connection over any `AsyncRead + AsyncWrite` stream.
///
/// A reader task decodes frames into an inbound queue and a writer task
/// drains the outbound queue. A Disconnect frame carries the reason text;
/// EOF or a decode error closes the link. Frames arriving while the inbound
/// queue is full are dropped. Dropping the handle closes the link.
pub struct StreamConnection {
    info: ConnectionInfo,
    outbound: mpsc::Sender<Message>,
    inbound: Mutex<mpsc::Receiver<Message>>,
    max_message_size: usize,
    link: Arc<Link>,
}

impl StreamConnection {
    /// Start the reader and writer tasks on the current runtime.
    ///
    /// `info` describes the remote as established by the outer handshake.
    pub fn spawn<S>(io: S, info: ConnectionInfo, max_message_size: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(io);
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<Message>(CHANNEL_CAPACITY);
        let link = Arc::new(Link::new());
        let peer_id = info.peer_id;

        // Writer task
        let mut writer = FramedWrite::new(write_half, MessageCodec::new(max_message_size));
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let last = msg.message_type() == Some(MessageType::Disconnect);
                if let Err(e) = writer.send(msg).await {
                    debug!("Write to peer {} failed: {}", peer_id, e);
                    break;
                }
                if last {
                    break;
                }
            }
            let _ = writer.close().await;
            trace!("Writer for peer {} finished", peer_id);
        });

        // Reader task
        let mut reader = FramedRead::new(read_half, MessageCodec::new(max_message_size));
        let reader_link = link.clone();
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    next = reader.next() => next,
                    _ = reader_link.closed() => break,
                };
                match next {
                    Some(Ok(msg)) if msg.message_type() == Some(MessageType::Disconnect) => {
                        let reason = (!msg.payload.is_empty()).then(|| {
                            DisconnectReason::from_text(&String::from_utf8_lossy(&msg.payload))
                        });
                        debug!("Peer {} sent disconnect: {:?}", peer_id, reason);
                        reader_link.close(reason);
                        break;
                    }
                    // Never block on the queue: EOF and Disconnect frames must still be seen.
                    Some(Ok(msg)) => match in_tx.try_send(msg) {
                        Ok(()) => {}
                        Err(TrySendError::Full(msg)) => {
                            debug!(
                                "Inbound queue for peer {} full, dropping code {} message",
                                peer_id, msg.code
                            );
                        }
                        Err(TrySendError::Closed(_)) => break,
                    },
                    Some(Err(e)) => {
                        debug!("Read from peer {} failed: {}", peer_id, e);
                        reader_link.close(Some(e.disconnect_reason()));
                        break;
                    }
                    None => {
                        reader_link.close(None);
                        break;
                    }
                }
            }
            trace!("Reader for peer {} finished", peer_id);
        });

        Self {
            info,
            outbound: out_tx,
            inbound: Mutex::new(in_rx),
            max_message_size,
            link,
        }
    }

    /// Reason the link was closed with, if closed with one
    pub fn disconnect_reason(&self) -> Option<DisconnectReason> {
        self.link.reason()
    }
}

impl Drop for StreamConnection {
    fn drop(&mut self) {
        // Stops the reader; the writer ends once the outbound sender is gone.
        self.link.close(None);
    }
}

#[async_trait]
impl ProtocolConnection for StreamConnection {
    fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    async fn send(&self, msg: Message) -> BzzEthResult<()> {
        if self.link.is_closed() {
            return Err(BzzEthError::Disconnected(self.link.reason()));
        }
        let size = 1 + msg.payload.len();
        if size > self.max_message_size {
            return Err(BzzEthError::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }
        self.outbound
            .send(msg)
            .await
            .map_err(|_| BzzEthError::ChannelClosed)
    }

    async fn recv(&self) -> BzzEthResult<Message> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            biased;
            // The reader only drops its sender after closing the link.
            msg = inbound.recv() => msg.ok_or_else(|| BzzEthError::Disconnected(self.link.reason())),
            _ = self.link.closed() => Err(BzzEthError::Disconnected(self.link.reason())),
        }
    }

    async fn disconnect(&self, reason: Option<DisconnectReason>) {
        let text = reason.as_ref().map(|r| r.to_string());
        if self.link.close(reason) {
            // Best effort: the writer may already be gone.
            let _ = self.outbound.send(Message::disconnect(text.as_deref())).await;
        }
    }

    async fn closed(&self) {
        self.link.closed().await
    }

    fn is_closed(&self) -> bool {
        self.link.is_closed()
    }
}
