//! One-shot capability handshake

use std::time::Duration;

use tokio::time::timeout;
use tracing::trace;

use crate::error::{BzzEthError, BzzEthResult};
use crate::message::{Handshake, Message};
use crate::transport::ProtocolConnection;

/// Send our handshake and wait for the remote's, concurrently.
///
/// Both directions must complete inside `window`. Returns the remote's
/// handshake; our own flag never leaks into the result.
pub async fn perform_handshake(
    conn: &dyn ProtocolConnection,
    local: Handshake,
    window: Duration,
) -> BzzEthResult<Handshake> {
    let outgoing = Message::from_typed(&local)?;
    let peer_id = conn.info().peer_id;

    let send = async {
        conn.send(outgoing).await?;
        trace!("Sent handshake {:?} to {}", local, peer_id);
        Ok::<_, BzzEthError>(())
    };
    let receive = async {
        let msg = conn.recv().await?;
        let remote = msg.decode_as::<Handshake>()?;
        trace!("Received handshake {:?} from {}", remote, peer_id);
        Ok::<_, BzzEthError>(remote)
    };

    let (_, remote) = timeout(window, async { tokio::try_join!(send, receive) })
        .await
        .map_err(|_| BzzEthError::Timeout(format!("no handshake within {:?}", window)))??;

    Ok(remote)
}
