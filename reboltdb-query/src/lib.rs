//! # reboltdb-query
//!
//! Query term algebra for reboltdb.
//!
//! This crate provides:
//! - An owned JSON value tree with predicate and zero-value accessors
//! - The static result-type lattice used to classify expressions
//! - The ql2-compatible operator table
//! - Translation of JSON-encoded query expressions into typed term trees

pub mod error;
pub mod term;
pub mod term_type;
pub mod types;
pub mod value;

pub use error::QueryError;
pub use term::Term;
pub use term_type::TermType;
pub use types::TypeFlag;
pub use value::Value;
