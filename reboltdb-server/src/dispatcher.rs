//! Per-connection query dispatch.
//!
//! Decodes framed requests, dedupes them by token, routes by query kind,
//! and materializes the term tree. Execution is a reserved hook; the
//! storage handle is carried here for the engine to consume.

use crate::error::ServerError;
use reboltdb_protocol::{QueryFrame, QueryKind};
use reboltdb_query::{Term, Value};
use reboltdb_storage::Storage;
use std::collections::HashSet;
use std::sync::Arc;

/// Dispatcher state for one connection. Exclusively owned by the
/// connection's task; dropping it releases every in-flight token.
pub struct QueryDispatcher {
    live_tokens: HashSet<u64>,
    storage: Arc<Storage>,
}

impl QueryDispatcher {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            live_tokens: HashSet::new(),
            storage,
        }
    }

    /// Handles one framed request.
    pub fn dispatch(&mut self, frame: QueryFrame) -> Result<(), ServerError> {
        let query = Value::parse(&frame.payload)?;

        let mut elements = match query {
            Value::Array(elements) => elements,
            other => {
                return Err(ServerError::InvalidQuery(format!(
                    "expected query to be array, but found {}",
                    other.type_name()
                )));
            }
        };
        if elements.is_empty() || elements.len() > 3 {
            return Err(ServerError::InvalidQuery(format!(
                "expected 1 to 3 elements in the top-level query, but found {}",
                elements.len()
            )));
        }

        if !elements[0].is_number() {
            return Err(ServerError::InvalidQuery(format!(
                "expected query type to be number, but found {}",
                elements[0].type_name()
            )));
        }
        let code = elements[0].as_i64();
        let kind = QueryKind::from_wire(code).ok_or(ServerError::UnknownQueryType(code))?;

        match kind {
            QueryKind::Start => {
                if elements.len() != 3 {
                    return Err(ServerError::InvalidQuery(format!(
                        "expected 3 elements in top-level START query, but found {}",
                        elements.len()
                    )));
                }
                let global_opt_args = match elements.pop() {
                    Some(opts) if opts.is_object() => opts,
                    Some(opts) => {
                        return Err(ServerError::InvalidQuery(format!(
                            "expected global optargs to be object, but found {}",
                            opts.type_name()
                        )));
                    }
                    None => return Err(ServerError::Internal("query elements exhausted".into())),
                };
                let term_value = match elements.pop() {
                    Some(value) => value,
                    None => return Err(ServerError::Internal("query elements exhausted".into())),
                };
                self.start_query(frame.token, term_value, global_opt_args)
            }
            QueryKind::Continue
            | QueryKind::Stop
            | QueryKind::NoreplyWait
            | QueryKind::ServerInfo => Err(ServerError::UnsupportedQueryType(kind.name())),
        }
    }

    fn start_query(
        &mut self,
        token: u64,
        term_value: Value,
        global_opt_args: Value,
    ) -> Result<(), ServerError> {
        if !self.live_tokens.insert(token) {
            return Err(ServerError::DuplicateToken(token));
        }

        tracing::debug!(token, "start query global optargs: {}", global_opt_args);

        let term = Term::from_value(term_value)?;
        term.validate()?;

        tracing::info!(token, "term tree:\n{}", term);

        self.execute(token, term, global_opt_args)
    }

    /// Hand-off point for the execution engine. Until the engine exists the
    /// query is accepted and left pending; its token stays live.
    fn execute(&mut self, token: u64, term: Term, _global_opt_args: Value) -> Result<(), ServerError> {
        tracing::debug!(
            token,
            result_type = %term
                .result_type()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "undeclared".to_string()),
            "execution engine not wired yet; query accepted"
        );
        Ok(())
    }

    /// Frees a token once its query reaches a terminal state (completed,
    /// errored, or stopped). Returns whether the token was live.
    pub fn release_token(&mut self, token: u64) -> bool {
        self.live_tokens.remove(&token)
    }

    /// Number of in-flight queries on this connection.
    pub fn live_queries(&self) -> usize {
        self.live_tokens.len()
    }

    /// The shared storage handle queries run against.
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }
}
