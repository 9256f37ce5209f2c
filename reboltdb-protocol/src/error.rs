//! Protocol error types and handshake error codes.

use thiserror::Error;

/// Protocol-level errors that can occur during framing or handshake
/// message handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unrecognized version magic number: {0:#010x}")]
    UnrecognizedMagic(u32),

    #[error("unsupported protocol version: {0:?}")]
    UnsupportedVersion(crate::Version),

    #[error("handshake message exceeds {max} bytes without a terminator", max = crate::MAX_HANDSHAKE_MESSAGE_SIZE)]
    HandshakeMessageTooLong,

    #[error("query frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u32, max: u32 },

    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Numeric error codes written to clients in handshake failure bodies.
///
/// RethinkDB reserves the 10..20 range for handshake errors; these values
/// are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ErrorCode {
    /// Framing or version violation.
    Protocol = 10,
    /// The client proof did not verify.
    AuthRejected = 12,
    /// The authentication payload was malformed.
    AuthFormat = 13,
    /// Unexpected server-side failure.
    Internal = 16,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        self as i64
    }
}
