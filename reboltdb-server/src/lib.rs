//! # reboltdb-server
//!
//! TCP server for reboltdb.
//!
//! This crate provides:
//! - TCP connection handling with async I/O
//! - The V1_0 handshake state machine (version magic, SCRAM-SHA-256)
//! - Per-connection query dispatch with token tracking
//! - Configuration loading with environment overrides

pub mod auth;
pub mod config;
mod connection;
pub mod dispatcher;
pub mod error;
pub mod server;

pub use auth::{ScramCredentials, ScramExchange};
pub use config::{AuthConfig, Config, NetworkConfig, StorageConfig};
pub use dispatcher::QueryDispatcher;
pub use error::ServerError;
pub use server::{Server, ServerConfig, ServerStats};
