//! Outcomes delivered by the dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Generation, SearchResult};

/// Message shown to users for any failed search
pub const SEARCH_FAILED_MESSAGE: &str = "Error performing search";

/// Why a dispatched search failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Network failure or non-success status
    Transport,
    /// The provider did not answer within the configured timeout
    Timeout,
    /// The provider answered with a payload of the wrong shape
    Decode,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => f.write_str("transport"),
            FailureKind::Timeout => f.write_str("timeout"),
            FailureKind::Decode => f.write_str("decode"),
        }
    }
}

/// A failed search: a generic message for users plus the full detail for logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFailure {
    pub kind: FailureKind,
    pub message: String,
    pub detail: String,
}

impl SearchFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            message: SEARCH_FAILED_MESSAGE.to_string(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SearchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}: {})", self.message, self.kind, self.detail)
    }
}

/// Terminal result of one dispatched search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum SearchOutcome {
    Success(Vec<SearchResult>),
    Failure(SearchFailure),
}

impl SearchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Success(_))
    }

    /// Results to display; a failure displays nothing
    pub fn results(&self) -> &[SearchResult] {
        match self {
            SearchOutcome::Success(results) => results,
            SearchOutcome::Failure(_) => &[],
        }
    }

    pub fn failure(&self) -> Option<&SearchFailure> {
        match self {
            SearchOutcome::Success(_) => None,
            SearchOutcome::Failure(f) => Some(f),
        }
    }
}

/// An outcome together with the generation of the request that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedOutcome {
    pub generation: Generation,
    pub outcome: SearchOutcome,
}

impl TaggedOutcome {
    pub fn new(generation: Generation, outcome: SearchOutcome) -> Self {
        Self {
            generation,
            outcome,
        }
    }
}
