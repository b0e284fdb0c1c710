//! Message encoding/decoding for stream transports

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::BzzEthError;
use crate::message::{Message, LENGTH_PREFIX_SIZE, MAX_MESSAGE_SIZE};

/// Codec for framing protocol messages.
///
/// Wire format: [length: u32 BE] [code: u8] [payload], where length covers
/// the code byte and the payload.
#[derive(Debug)]
pub struct MessageCodec {
    max_message_size: usize,
    decode_state: DecodeState,
}

#[derive(Debug, Default)]
enum DecodeState {
    #[default]
    ReadingLength,
    ReadingBody {
        length: usize,
    },
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(MAX_MESSAGE_SIZE)
    }
}

impl MessageCodec {
    /// Creates a codec enforcing the given frame size limit
    pub fn new(max_message_size: usize) -> Self {
        Self {
            max_message_size,
            decode_state: DecodeState::ReadingLength,
        }
    }

    fn check_size(&self, size: usize) -> Result<(), BzzEthError> {
        if size > self.max_message_size {
            return Err(BzzEthError::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }
        Ok(())
    }
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = BzzEthError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match &self.decode_state {
                DecodeState::ReadingLength => {
                    if src.len() < LENGTH_PREFIX_SIZE {
                        return Ok(None);
                    }

                    let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
                    if length == 0 {
                        return Err(BzzEthError::InvalidMessage("zero length frame".into()));
                    }
                    self.check_size(length)?;

                    src.advance(LENGTH_PREFIX_SIZE);
                    src.reserve(length);
                    self.decode_state = DecodeState::ReadingBody { length };
                }
                DecodeState::ReadingBody { length } => {
                    let length = *length;
                    if src.len() < length {
                        return Ok(None);
                    }

                    let mut body = src.split_to(length);
                    self.decode_state = DecodeState::ReadingLength;

                    let code = body.get_u8();
                    return Ok(Some(Message::new(code, body.freeze())));
                }
            }
        }
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = BzzEthError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = 1 + item.payload.len();
        self.check_size(length)?;

        dst.reserve(LENGTH_PREFIX_SIZE + length);
        dst.put_u32(length as u32);
        dst.put_u8(item.code);
        dst.put_slice(&item.payload);
        Ok(())
    }
}
