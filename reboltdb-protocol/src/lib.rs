//! # reboltdb-protocol
//!
//! RethinkDB-compatible wire protocol for reboltdb.
//!
//! This crate provides:
//! - The protocol version magic numbers
//! - NUL-delimited JSON handshake messages
//! - Token/length-delimited query framing
//! - Query kind codes and protocol error types
//!
//! All fixed-width integers on the wire are little-endian.

pub mod error;
pub mod frame;
pub mod handshake;
pub mod query;

pub use error::{ErrorCode, ProtocolError};
pub use frame::{encode_response, QueryFrame, QUERY_HEADER_SIZE};
pub use handshake::{
    decode_nul_message, encode_nul_json, ClientAuthMessage, HandshakeError, ServerAuthMessage,
    ServerGreeting,
};
pub use query::QueryKind;

/// Protocol version magic numbers, as defined by the ql2 `Version` enum.
/// The client sends one of these as a raw little-endian u32 when it
/// connects; it is not part of any framed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Version {
    V0_1 = 0x3f61ba36,
    V0_2 = 0x723081e1,
    V0_3 = 0x5f75e83e,
    V0_4 = 0x400c2d20,
    V1_0 = 0x34c2bdc3,
}

impl Version {
    /// Decodes a version magic number.
    pub fn from_magic(magic: u32) -> Option<Version> {
        match magic {
            0x3f61ba36 => Some(Version::V0_1),
            0x723081e1 => Some(Version::V0_2),
            0x5f75e83e => Some(Version::V0_3),
            0x400c2d20 => Some(Version::V0_4),
            0x34c2bdc3 => Some(Version::V1_0),
            _ => None,
        }
    }

    pub fn magic(self) -> u32 {
        self as u32
    }
}

/// The protocol sub-version negotiated inside the V1_0 handshake. Only 0
/// exists.
pub const PROTOCOL_VERSION: i64 = 0;

/// Server version string reported in the greeting.
pub const SERVER_VERSION: &str = "ReboltDB 0.1.0";

/// Maximum size of a framed query payload (64 MiB).
pub const MAX_QUERY_SIZE: u32 = 64 * 1024 * 1024;

/// Maximum size of a NUL-terminated handshake message (4 KiB).
pub const MAX_HANDSHAKE_MESSAGE_SIZE: usize = 4096;

/// Default port for reboltdb.
pub const DEFAULT_PORT: u16 = 28015;
