//! Protocol configuration

use crate::classifier::OVERLAY_CAPABILITY;
use crate::error::{BzzEthError, BzzEthResult};
use crate::message::MAX_MESSAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// bzzeth configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BzzEthConfig {
    /// Whether this node serves headers, sent in our handshake
    #[serde(default = "default_serve_headers")]
    pub serve_headers: bool,
    /// Handshake window in milliseconds
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Maximum message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Capability that marks a peer as overlay-native
    #[serde(default = "default_overlay_capability")]
    pub overlay_capability: String,
}

fn default_serve_headers() -> bool {
    true
}

fn default_handshake_timeout_ms() -> u64 {
    3_000
}

fn default_max_message_size() -> usize {
    MAX_MESSAGE_SIZE
}

fn default_overlay_capability() -> String {
    OVERLAY_CAPABILITY.to_string()
}

impl Default for BzzEthConfig {
    fn default() -> Self {
        Self {
            serve_headers: default_serve_headers(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            max_message_size: default_max_message_size(),
            overlay_capability: default_overlay_capability(),
        }
    }
}

impl BzzEthConfig {
    /// Parse from JSON, filling unset fields with defaults
    pub fn from_json_str(json: &str) -> BzzEthResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BzzEthError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the protocol cannot run with
    pub fn validate(&self) -> BzzEthResult<()> {
        if self.handshake_timeout_ms == 0 {
            return Err(BzzEthError::Config("handshake timeout must be non-zero".into()));
        }
        if self.max_message_size == 0 {
            return Err(BzzEthError::Config("max message size must be non-zero".into()));
        }
        if self.overlay_capability.is_empty() {
            return Err(BzzEthError::Config("overlay capability must be set".into()));
        }
        Ok(())
    }

    /// Handshake window
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Set whether we serve headers
    pub fn with_serve_headers(mut self, serve_headers: bool) -> Self {
        self.serve_headers = serve_headers;
        self
    }

    /// Set handshake window
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set maximum message size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the overlay capability name
    pub fn with_overlay_capability(mut self, name: impl Into<String>) -> Self {
        self.overlay_capability = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BzzEthConfig::default();
        assert!(config.serve_headers);
        assert_eq!(config.handshake_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_message_size, 10 * 1024 * 1024);
        assert_eq!(config.overlay_capability, "bzz");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_empty_json() {
        let config = BzzEthConfig::from_json_str("{}").unwrap();
        assert_eq!(config, BzzEthConfig::default());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config =
            BzzEthConfig::from_json_str(r#"{"serve_headers": false, "handshake_timeout_ms": 500}"#)
                .unwrap();
        assert!(!config.serve_headers);
        assert_eq!(config.handshake_timeout(), Duration::from_millis(500));
        assert_eq!(config.overlay_capability, "bzz");
    }

    #[test]
    fn test_config_rejects_zero_timeout() {
        let err = BzzEthConfig::from_json_str(r#"{"handshake_timeout_ms": 0}"#).unwrap_err();
        assert!(matches!(err, BzzEthError::Config(_)));
    }

    #[test]
    fn test_config_rejects_bad_json() {
        assert!(matches!(
            BzzEthConfig::from_json_str("{serve_headers"),
            Err(BzzEthError::Config(_))
        ));
    }

    #[test]
    fn test_config_builders() {
        let config = BzzEthConfig::default()
            .with_serve_headers(false)
            .with_handshake_timeout(Duration::from_millis(250))
            .with_max_message_size(1024)
            .with_overlay_capability("hive");
        assert!(!config.serve_headers);
        assert_eq!(config.handshake_timeout_ms, 250);
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.overlay_capability, "hive");

        assert!(BzzEthConfig::default().with_max_message_size(0).validate().is_err());
    }

    #[test]
    fn test_config_huge_timeout_saturates() {
        let config = BzzEthConfig::default().with_handshake_timeout(Duration::MAX);
        assert_eq!(config.handshake_timeout_ms, u64::MAX);
        assert!(config.validate().is_ok());
    }
}
