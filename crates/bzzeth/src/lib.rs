//! # bzzeth
//!
//! Swarm/Eth bridging sub-protocol.
//!
//! Lets a Swarm node reach Eth full nodes for block headers over its own
//! connections. This crate provides:
//! - Peer classification (overlay-native Swarm node vs. Eth node)
//! - One-shot capability handshake (`serve_headers`)
//! - Registry of handshaken peers
//! - Per-connection session loop with service-wide shutdown
//!
//! ## Architecture
//!
//! ```text
//! +-------------------+
//! |      BzzEth       |  <- Service: registry + shutdown signal
//! +-------------------+
//!          |
//! +-------------------+
//! |      Session      |  <- One per connection
//! +-------------------+
//!     |           |
//! +--------+ +-----------+
//! |Classify| | Handshake |
//! +--------+ +-----------+
//!          |
//! +-------------------+
//! | ProtocolConnection|  <- Transport seam (memory, stream)
//! +-------------------+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use bzzeth::{BzzEth, BzzEthConfig, StreamConnection};
//!
//! let service = BzzEth::new(BzzEthConfig::default());
//!
//! // For every connection the transport accepts:
//! let conn = Arc::new(StreamConnection::spawn(stream, info, service.protocol().max_message_size));
//! let svc = service.clone();
//! tokio::spawn(async move { svc.run(conn).await });
//!
//! // Later, pick a peer for header requests
//! let peers = service.peers().header_serving_peers();
//!
//! // On exit
//! service.stop();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod classifier;
mod codec;
mod config;
mod error;
mod handshake;
mod memory;
mod message;
mod peer;
mod service;
mod session;
mod shutdown;
mod stream;
mod transport;
mod types;

pub use classifier::{CapabilityClassifier, PeerClassifier, OVERLAY_CAPABILITY};
pub use codec::MessageCodec;
pub use config::BzzEthConfig;
pub use error::{BzzEthError, BzzEthResult};
pub use handshake::perform_handshake;
pub use memory::MemoryConnection;
pub use message::{
    Handshake, Message, MessageType, ProtocolMessage, ProtocolSpec, MAX_MESSAGE_SIZE,
    PROTOCOL_LENGTH, PROTOCOL_NAME, PROTOCOL_VERSION,
};
pub use peer::{Peer, PeerRegistry};
pub use service::BzzEth;
pub use session::SessionOutcome;
pub use shutdown::ShutdownSignal;
pub use stream::StreamConnection;
pub use transport::ProtocolConnection;
pub use types::{Capability, ConnectionInfo, DisconnectReason, PeerId};
