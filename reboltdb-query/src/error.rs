//! Query error types.

use thiserror::Error;

/// Errors from query document parsing and term tree construction.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("unable to parse JSON at field {path}: {source}")]
    JsonParse {
        /// Field path into the document, e.g. `.`, `.[3]`, `.["key"]`.
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected 1 to 3 entries in term array, but got {0}")]
    TermArity(usize),

    #[error("expected {what} to be {expected}, but got {found}")]
    TermShape {
        what: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unrecognized term type code: {0}")]
    UnknownOperator(i64),

    #[error("term type {0} is not supported")]
    UnsupportedTerm(&'static str),

    #[error("{context} -> {source}")]
    Context {
        context: String,
        #[source]
        source: Box<QueryError>,
    },
}

impl QueryError {
    /// Wraps the error with a context prefix naming the enclosing operator
    /// and the argument position it came from.
    pub fn context(self, context: String) -> QueryError {
        QueryError::Context {
            context,
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_display() {
        let inner = QueryError::TermArity(5);
        let wrapped = inner
            .context("DB arg[0]".to_string())
            .context("TABLE arg[0]".to_string());
        assert_eq!(
            wrapped.to_string(),
            "TABLE arg[0] -> DB arg[0] -> expected 1 to 3 entries in term array, but got 5"
        );
    }

    #[test]
    fn test_term_shape_display() {
        let err = QueryError::TermShape {
            what: "term type",
            expected: "number",
            found: "string",
        };
        assert_eq!(
            err.to_string(),
            "expected term type to be number, but got string"
        );
    }
}
