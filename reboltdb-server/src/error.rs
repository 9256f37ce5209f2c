//! Server error types.

use crate::config::ConfigError;
use reboltdb_protocol::ErrorCode;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] reboltdb_protocol::ProtocolError),

    #[error("query error: {0}")]
    Query(#[from] reboltdb_query::QueryError),

    #[error("storage error: {0}")]
    Storage(#[from] reboltdb_storage::StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("unrecognized query type code: {0}")]
    UnknownQueryType(i64),

    #[error("query type {0} not yet implemented")]
    UnsupportedQueryType(&'static str),

    #[error("duplicate token: {0}")]
    DuplicateToken(u64),

    #[error("malformed authentication: {0}")]
    AuthFormat(String),

    #[error("authentication rejected: {0}")]
    AuthRejected(String),

    #[error("handshake phase timed out")]
    HandshakeTimeout,

    #[error("server shutting down")]
    ShuttingDown,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// The numeric code written in handshake error bodies.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ServerError::Protocol(_)
            | ServerError::InvalidQuery(_)
            | ServerError::UnknownQueryType(_)
            | ServerError::UnsupportedQueryType(_)
            | ServerError::DuplicateToken(_)
            | ServerError::Query(_)
            | ServerError::HandshakeTimeout => ErrorCode::Protocol,
            ServerError::AuthFormat(_) => ErrorCode::AuthFormat,
            ServerError::AuthRejected(_) => ErrorCode::AuthRejected,
            ServerError::Io(_)
            | ServerError::Storage(_)
            | ServerError::Config(_)
            | ServerError::ShuttingDown
            | ServerError::Internal(_) => ErrorCode::Internal,
        }
    }
}
