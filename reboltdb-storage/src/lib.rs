//! # reboltdb-storage
//!
//! Storage layer for reboltdb.
//!
//! This crate provides the ordered key/value store the execution engine
//! runs against: a single on-disk database file with transactional
//! `view`/`update` access and byte-ordered key iteration.

pub mod error;
pub mod store;

pub use error::StorageError;
pub use store::{Storage, DATA_TABLE};
