//! Peer identity and connection types

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Peer identifier (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId([u8; 32]);

impl PeerId {
    /// Create from bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive from an uncompressed secp256k1 public key (without the 0x04 prefix)
    pub fn from_public_key(public_key: &[u8; 64]) -> Self {
        let digest = Keccak256::digest(public_key);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Generate random peer ID
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// A protocol advertised by a peer during the outer transport handshake
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capability {
    /// Protocol name, e.g. `bzz` or `bzzeth`
    pub name: String,
    /// Protocol version
    pub version: u32,
}

impl Capability {
    /// Create a new capability
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

/// What the transport learned about the remote before handing over the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Remote identity
    pub peer_id: PeerId,
    /// Capabilities the remote advertised
    pub capabilities: Vec<Capability>,
}

impl ConnectionInfo {
    /// Create new connection info
    pub fn new(peer_id: PeerId, capabilities: Vec<Capability>) -> Self {
        Self {
            peer_id,
            capabilities,
        }
    }

    /// Whether the remote advertised a protocol with this name, any version
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|cap| cap.name == name)
    }
}

/// Reason attached to a non-graceful disconnect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The sub-protocol ended without running (remote is overlay-native)
    ProtocolReturned,
    /// Handshake failed: bad message, bad payload or timeout
    ProtocolViolation,
    /// Disconnect requested locally
    Requested,
    /// Anything else, free text
    Other(String),
}

impl DisconnectReason {
    /// Parse the text form sent on the wire
    pub fn from_text(text: &str) -> Self {
        match text {
            "protocol returned" => Self::ProtocolReturned,
            "protocol violation" => Self::ProtocolViolation,
            "disconnect requested" => Self::Requested,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtocolReturned => write!(f, "protocol returned"),
            Self::ProtocolViolation => write!(f, "protocol violation"),
            Self::Requested => write!(f, "disconnect requested"),
            Self::Other(text) => write!(f, "{}", text),
        }
    }
}
