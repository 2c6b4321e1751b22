//! Typed errors for the search orchestration core.
//!
//! `BackendUnavailable`, `BackendTimeout`, and `BackendFailure` are the three
//! "soft" kinds: `SearchOrchestrator::search` catches them internally and
//! turns them into entries of a response's `degraded` list rather than
//! propagating them. The remaining kinds are "hard" failures that propagate
//! to the caller.

use std::fmt;

/// Which retrieval backend an error (or a degraded-response entry) refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Keyword,
    Vector,
    Graph,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackendKind::Keyword => "keyword",
            BackendKind::Vector => "vector",
            BackendKind::Graph => "graph",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("backend unavailable: {backend}")]
    BackendUnavailable { backend: BackendKind },

    #[error("backend timed out: {backend}")]
    BackendTimeout { backend: BackendKind },

    #[error("backend failure ({backend}): {message}")]
    BackendFailure {
        backend: BackendKind,
        message: String,
    },

    #[error("all requested backends failed")]
    AllBackendsFailed,

    #[error("stale write rejected for repository {repository_url}")]
    StaleWrite { repository_url: String },

    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(String),
}
