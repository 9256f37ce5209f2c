//! Query kind codes.

/// Top-level query kinds, numerically identical to ql2 `Query.QueryType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum QueryKind {
    /// Run a new query.
    Start = 1,
    /// Fetch the next batch of a cursor.
    Continue = 2,
    /// Stop a running query.
    Stop = 3,
    /// Wait for outstanding noreply writes.
    NoreplyWait = 4,
    /// Request server identity.
    ServerInfo = 5,
}

impl QueryKind {
    /// Decodes a wire query kind code.
    pub fn from_wire(code: i64) -> Option<QueryKind> {
        match code {
            1 => Some(QueryKind::Start),
            2 => Some(QueryKind::Continue),
            3 => Some(QueryKind::Stop),
            4 => Some(QueryKind::NoreplyWait),
            5 => Some(QueryKind::ServerInfo),
            _ => None,
        }
    }

    /// The wire name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            QueryKind::Start => "START",
            QueryKind::Continue => "CONTINUE",
            QueryKind::Stop => "STOP",
            QueryKind::NoreplyWait => "NOREPLY_WAIT",
            QueryKind::ServerInfo => "SERVER_INFO",
        }
    }
}
