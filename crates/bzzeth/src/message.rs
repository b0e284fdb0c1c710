//! Protocol messages

use crate::error::{BzzEthError, BzzEthResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Protocol name advertised to the transport
pub const PROTOCOL_NAME: &str = "bzzeth";

/// Protocol version
pub const PROTOCOL_VERSION: u32 = 1;

/// Number of message codes reserved by the protocol
pub const PROTOCOL_LENGTH: u8 = 4;

/// Maximum message size (10 MB)
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Length prefix size (4 bytes)
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Static description of the protocol, for the transport's capability list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSpec {
    /// Protocol name
    pub name: &'static str,
    /// Protocol version
    pub version: u32,
    /// Number of message codes
    pub length: u8,
    /// Maximum message size
    pub max_message_size: usize,
}

impl Default for ProtocolSpec {
    fn default() -> Self {
        Self {
            name: PROTOCOL_NAME,
            version: PROTOCOL_VERSION,
            length: PROTOCOL_LENGTH,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// Known message codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    /// Handshake message
    Handshake = 0,
    /// Transport-level disconnect, carries the reason text
    Disconnect = 255,
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Handshake),
            255 => Ok(Self::Disconnect),
            _ => Err(()),
        }
    }
}

/// A typed payload with a fixed message code
pub trait ProtocolMessage: Serialize + DeserializeOwned {
    /// Code the message travels under
    const TYPE: MessageType;
}

/// Handshake data, exchanged once in each direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Sender is willing to serve headers
    pub serve_headers: bool,
}

impl Handshake {
    /// Create a new handshake
    pub fn new(serve_headers: bool) -> Self {
        Self { serve_headers }
    }
}

impl ProtocolMessage for Handshake {
    const TYPE: MessageType = MessageType::Handshake;
}

/// Network message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Raw message code
    pub code: u8,
    /// Payload
    pub payload: Bytes,
}

impl Message {
    /// Create a new message
    pub fn new(code: u8, payload: Bytes) -> Self {
        Self { code, payload }
    }

    /// Serialize a typed message
    pub fn from_typed<T: ProtocolMessage>(msg: &T) -> BzzEthResult<Self> {
        let payload = serde_json::to_vec(msg)
            .map_err(|e| BzzEthError::InvalidMessage(format!("serialize error: {}", e)))?;
        Ok(Self::new(T::TYPE as u8, payload.into()))
    }

    /// Create disconnect message
    pub fn disconnect(reason: Option<&str>) -> Self {
        let payload = reason
            .map(|r| Bytes::copy_from_slice(r.as_bytes()))
            .unwrap_or_default();
        Self::new(MessageType::Disconnect as u8, payload)
    }

    /// Known type of this message, if any
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::try_from(self.code).ok()
    }

    /// Deserialize into a typed message, checking the code first
    pub fn decode_as<T: ProtocolMessage>(&self) -> BzzEthResult<T> {
        if self.code != T::TYPE as u8 {
            return Err(BzzEthError::ProtocolViolation(format!(
                "expected message code {}, got {}",
                T::TYPE as u8,
                self.code
            )));
        }
        serde_json::from_slice(&self.payload)
            .map_err(|e| BzzEthError::ProtocolViolation(format!("malformed payload: {}", e)))
    }

    /// Encoded size including the length prefix
    pub fn encoded_len(&self) -> usize {
        LENGTH_PREFIX_SIZE + 1 + self.payload.len()
    }

    /// Encode message to bytes
    /// Format: [length: 4 bytes][code: 1 byte][payload: N bytes]
    pub fn encode(&self) -> Bytes {
        let len = 1 + self.payload.len();
        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + len);
        buf.put_u32(len as u32);
        buf.put_u8(self.code);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Decode message from bytes
    pub fn decode(mut data: Bytes) -> Option<Self> {
        if data.len() < LENGTH_PREFIX_SIZE + 1 {
            return None;
        }
        let len = data.get_u32() as usize;
        if data.len() < len || len < 1 {
            return None;
        }
        let code = data.get_u8();
        let payload = data.split_to(len - 1);
        Some(Self { code, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_spec_default() {
        let spec = ProtocolSpec::default();
        assert_eq!(spec.name, "bzzeth");
        assert_eq!(spec.version, 1);
        assert_eq!(spec.length, 4);
        assert_eq!(spec.max_message_size, 10 * 1024 * 1024);
    }

    #[test]
    fn test_handshake_uses_code_zero() {
        let msg = Message::from_typed(&Handshake::new(true)).unwrap();
        assert_eq!(msg.code, 0);
        assert_eq!(msg.message_type(), Some(MessageType::Handshake));
    }

    #[test]
    fn test_handshake_payload_json() {
        let msg = Message::from_typed(&Handshake::new(false)).unwrap();
        assert_eq!(&msg.payload[..], br#"{"serve_headers":false}"#);
    }

    #[test]
    fn test_decode_as_wrong_code() {
        let msg = Message::new(3, Bytes::from_static(br#"{"serve_headers":true}"#));
        let err = msg.decode_as::<Handshake>().unwrap_err();
        assert!(matches!(err, BzzEthError::ProtocolViolation(_)));
        assert!(err.to_string().contains("got 3"));
    }

    #[test]
    fn test_decode_as_malformed_payload() {
        let msg = Message::new(0, Bytes::from_static(b"not json"));
        let err = msg.decode_as::<Handshake>().unwrap_err();
        assert!(err.to_string().contains("malformed payload"));

        let msg = Message::new(0, Bytes::from_static(br#"{"serve_headers":"yes"}"#));
        assert!(msg.decode_as::<Handshake>().is_err());
    }

    #[test]
    fn test_message_encode_layout() {
        let msg = Message::new(0, Bytes::from_static(b"abc"));
        let encoded = msg.encode();
        assert_eq!(&encoded[..], &[0, 0, 0, 4, 0, b'a', b'b', b'c']);
        assert_eq!(encoded.len(), msg.encoded_len());
        assert_eq!(Message::decode(encoded), Some(msg));
    }

    #[test]
    fn test_message_decode_too_short() {
        assert!(Message::decode(Bytes::from_static(&[0, 0, 0])).is_none());
    }

    #[test]
    fn test_message_decode_zero_length() {
        assert!(Message::decode(Bytes::from_static(&[0, 0, 0, 0, 0])).is_none());
    }

    #[test]
    fn test_message_decode_truncated_payload() {
        assert!(Message::decode(Bytes::from_static(&[0, 0, 0, 9, 0, 1])).is_none());
    }

    #[test]
    fn test_disconnect_message() {
        let msg = Message::disconnect(Some("protocol returned"));
        assert_eq!(msg.message_type(), Some(MessageType::Disconnect));
        assert_eq!(&msg.payload[..], b"protocol returned");
        assert!(Message::disconnect(None).payload.is_empty());
    }

    #[test]
    fn test_message_type_invalid_values() {
        for code in [1u8, 2, 3, 4, 128, 254] {
            assert!(MessageType::try_from(code).is_err());
        }
    }
}
