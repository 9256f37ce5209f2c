//! Handshake message types and the NUL-delimited JSON codec.
//!
//! Every handshake payload is a JSON object followed by a single NUL byte.

use crate::error::{ErrorCode, ProtocolError};
use crate::MAX_HANDSHAKE_MESSAGE_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Greeting written by the server after a valid version magic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerGreeting {
    pub success: bool,
    pub min_protocol_version: i64,
    pub max_protocol_version: i64,
    pub server_version: String,
}

impl ServerGreeting {
    pub fn new() -> Self {
        Self {
            success: true,
            min_protocol_version: crate::PROTOCOL_VERSION,
            max_protocol_version: crate::PROTOCOL_VERSION,
            server_version: crate::SERVER_VERSION.to_string(),
        }
    }
}

impl Default for ServerGreeting {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-first and client-final authentication payloads share one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientAuthMessage {
    #[serde(default)]
    pub protocol_version: i64,
    #[serde(default)]
    pub authentication_method: String,
    pub authentication: String,
}

/// Server-first and server-final authentication payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerAuthMessage {
    pub success: bool,
    pub authentication: String,
}

impl ServerAuthMessage {
    pub fn new(authentication: impl Into<String>) -> Self {
        Self {
            success: true,
            authentication: authentication.into(),
        }
    }
}

/// Best-effort error body written before closing a failed handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeError {
    pub success: bool,
    pub error: String,
    pub error_code: i64,
}

impl HandshakeError {
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            error_code: code.code(),
        }
    }
}

/// Encodes a handshake message as JSON followed by a NUL terminator.
pub fn encode_nul_json<T: Serialize>(message: &T) -> Result<BytesMut, ProtocolError> {
    let body = serde_json::to_vec(message)?;
    let mut buf = BytesMut::with_capacity(body.len() + 1);
    buf.put_slice(&body);
    buf.put_u8(0);
    Ok(buf)
}

/// Splits the next NUL-terminated message off the buffer, excluding the
/// terminator.
///
/// Returns `Ok(None)` when no terminator has arrived yet; errors when the
/// buffer grows past the handshake message cap without one.
pub fn decode_nul_message(buf: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
    match buf.iter().position(|&b| b == 0) {
        Some(pos) => {
            let message = buf.split_to(pos).freeze();
            buf.advance(1);
            Ok(Some(message))
        }
        None if buf.len() > MAX_HANDSHAKE_MESSAGE_SIZE => {
            Err(ProtocolError::HandshakeMessageTooLong)
        }
        None => Ok(None),
    }
}
