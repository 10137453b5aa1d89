use crate::message::Message;
use thiserror::Error;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Failed to encode message: {0}")]
    EncodeError(String),

    #[error("Failed to decode: {0}")]
    DecodeError(String),

    #[error("Payload too short: expected at least {expected} bytes, got {actual}")]
    PayloadTooShort { expected: usize, actual: usize },

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid base64 string: {0}")]
    InvalidBase64(String),
}

/// Codec for moving messages across process boundaries
pub struct MessageCodec;

impl MessageCodec {
    /// Encode a message to compact binary (postcard)
    pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
        postcard::to_allocvec(message).map_err(|e| CodecError::EncodeError(e.to_string()))
    }

    /// Decode a message from binary bytes
    pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
        postcard::from_bytes(bytes).map_err(|e| CodecError::DecodeError(e.to_string()))
    }

    /// Encode to hex string
    pub fn encode_hex(message: &Message) -> Result<String, CodecError> {
        Ok(hex::encode(Self::encode(message)?))
    }

    /// Decode from hex string (an optional 0x prefix is accepted)
    pub fn decode_hex(hex_str: &str) -> Result<Message, CodecError> {
        let trimmed = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(trimmed).map_err(|e| CodecError::InvalidHex(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// Encode to base64 string (URL-safe, no padding)
    pub fn encode_base64(message: &Message) -> Result<String, CodecError> {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        Ok(URL_SAFE_NO_PAD.encode(Self::encode(message)?))
    }

    /// Decode from base64 string
    pub fn decode_base64(b64_str: &str) -> Result<Message, CodecError> {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        let bytes = URL_SAFE_NO_PAD
            .decode(b64_str)
            .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
        Self::decode(&bytes)
    }
}
