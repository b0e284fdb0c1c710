//! Protocol error types

use crate::types::DisconnectReason;
use thiserror::Error;

/// bzzeth errors
#[derive(Debug, Error)]
pub enum BzzEthError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrong message code or malformed payload
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// No counterpart message within the allotted window
    #[error("timeout: {0}")]
    Timeout(String),

    /// The link went down, with the reason if one was given
    #[error("disconnected{}", .0.as_ref().map(|r| format!(": {}", r)).unwrap_or_default())]
    Disconnected(Option<DisconnectReason>),

    /// Channel closed
    #[error("channel closed")]
    ChannelClosed,

    /// Frame could not be decoded
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Frame exceeds the protocol's maximum message size
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge {
        /// Offending size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),
}

impl BzzEthError {
    /// Reason handed to the transport when this error ends a session.
    ///
    /// Timeouts surface the same way as protocol violations.
    pub fn disconnect_reason(&self) -> DisconnectReason {
        match self {
            Self::ProtocolViolation(_)
            | Self::Timeout(_)
            | Self::InvalidMessage(_)
            | Self::MessageTooLarge { .. } => DisconnectReason::ProtocolViolation,
            Self::Disconnected(Some(reason)) => reason.clone(),
            other => DisconnectReason::Other(other.to_string()),
        }
    }
}

/// Result type for bzzeth operations
pub type BzzEthResult<T> = Result<T, BzzEthError>;
