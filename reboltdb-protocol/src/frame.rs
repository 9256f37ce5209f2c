//! Query frame format.
//!
//! After the handshake, every request and response is framed the same way:
//!
//! ```text
//! +---------+---------+-----------------+
//! | token   | size    | payload         |
//! | 8 bytes | 4 bytes | size bytes JSON |
//! +---------+---------+-----------------+
//! ```
//!
//! The token and size are little-endian. The payload is UTF-8 JSON and is
//! not NUL-terminated.

use crate::error::ProtocolError;
use crate::MAX_QUERY_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the fixed frame header in bytes (8 + 4).
pub const QUERY_HEADER_SIZE: usize = 12;

/// A framed query request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFrame {
    /// Client-assigned 64-bit query token.
    pub token: u64,
    /// UTF-8 JSON payload.
    pub payload: Bytes,
}

impl QueryFrame {
    pub fn new(token: u64, payload: Bytes) -> Self {
        Self { token, payload }
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        encode_response(self.token, &self.payload)
    }

    /// Decodes a frame from the buffer.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on protocol errors.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < QUERY_HEADER_SIZE {
            return Ok(None);
        }

        // Peek at the header without consuming.
        let token = u64::from_le_bytes([
            buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
        ]);
        let size = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);

        if size > MAX_QUERY_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size,
                max: MAX_QUERY_SIZE,
            });
        }

        let total_len = QUERY_HEADER_SIZE + size as usize;
        if buf.len() < total_len {
            return Ok(None);
        }

        buf.advance(QUERY_HEADER_SIZE);
        let payload = buf.split_to(size as usize).freeze();

        Ok(Some(Self { token, payload }))
    }

    /// The payload as a UTF-8 string slice.
    pub fn payload_str(&self) -> Result<&str, ProtocolError> {
        std::str::from_utf8(&self.payload).map_err(|_| ProtocolError::InvalidUtf8)
    }
}

/// Encodes a response body under the given token. Responses share the
/// request framing.
pub fn encode_response(token: u64, payload: &[u8]) -> Result<BytesMut, ProtocolError> {
    let size = payload.len();
    if size > MAX_QUERY_SIZE as usize {
        return Err(ProtocolError::FrameTooLarge {
            size: size as u32,
            max: MAX_QUERY_SIZE,
        });
    }

    let mut buf = BytesMut::with_capacity(QUERY_HEADER_SIZE + size);
    buf.put_u64_le(token);
    buf.put_u32_le(size as u32);
    buf.put_slice(payload);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let frame = QueryFrame::new(42, Bytes::from_static(br#"[1,1,{}]"#));
        let encoded = frame.encode().unwrap();

        let mut buf = encoded;
        let decoded = QueryFrame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.token, 42);
        assert_eq!(decoded.payload, Bytes::from_static(br#"[1,1,{}]"#));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_header_is_little_endian() {
        let frame = QueryFrame::new(1, Bytes::from_static(b"[]"));
        let encoded = frame.encode().unwrap();
        assert_eq!(&encoded[0..8], &[1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&encoded[8..12], &[2, 0, 0, 0]);
        assert_eq!(&encoded[12..], b"[]");
    }

    #[test]
    fn test_incomplete_header() {
        let mut buf = BytesMut::from(&[1u8, 0, 0, 0, 0, 0][..]);
        assert!(QueryFrame::decode(&mut buf).unwrap().is_none());
        // Nothing consumed.
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_incomplete_payload() {
        let frame = QueryFrame::new(7, Bytes::from_static(b"[1,2,3]"));
        let encoded = frame.encode().unwrap();

        let mut buf = BytesMut::from(&encoded[..QUERY_HEADER_SIZE + 3]);
        assert!(QueryFrame::decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&encoded[QUERY_HEADER_SIZE + 3..]);
        let decoded = QueryFrame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.token, 7);
    }

    #[test]
    fn test_multiple_frames_in_buffer() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&QueryFrame::new(1, Bytes::from_static(b"[1]")).encode().unwrap());
        buf.extend_from_slice(&QueryFrame::new(2, Bytes::from_static(b"[2]")).encode().unwrap());

        assert_eq!(QueryFrame::decode(&mut buf).unwrap().unwrap().token, 1);
        assert_eq!(QueryFrame::decode(&mut buf).unwrap().unwrap().token, 2);
        assert!(QueryFrame::decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_frame_too_large() {
        let mut buf = BytesMut::new();
        buf.put_u64_le(1);
        buf.put_u32_le(MAX_QUERY_SIZE + 1);
        let result = QueryFrame::decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::FrameTooLarge { .. })));
    }

    #[test]
    fn test_payload_str() {
        let frame = QueryFrame::new(1, Bytes::from_static(b"[1,1,{}]"));
        assert_eq!(frame.payload_str().unwrap(), "[1,1,{}]");

        let bad = QueryFrame::new(1, Bytes::from_static(&[0xff, 0xfe]));
        assert!(matches!(
            bad.payload_str(),
            Err(ProtocolError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_empty_payload() {
        let frame = QueryFrame::new(9, Bytes::new());
        let mut buf = frame.encode().unwrap();
        let decoded = QueryFrame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.token, 9);
        assert!(decoded.payload.is_empty());
    }
}
