//! Generation-tagged search dispatch.
//!
//! Every submission bumps the dispatcher's generation counter. When the
//! provider answers, the outcome is handed back only if no newer submission
//! has happened in the meantime; otherwise it is dropped silently. This is
//! the only cancellation mechanism: superseded provider calls still run to
//! completion, their answers are just ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{
    FailureKind, Generation, RawRecord, SearchFailure, SearchInput, SearchOutcome, SearchRequest,
    TaggedOutcome, MIN_QUERY_LEN,
};
use crate::providers::{ProviderError, SearchProvider};
use crate::search::normalize::normalize_all;

/// Default bound on a single provider call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of [`Dispatcher::prepare`]
#[derive(Debug, Clone)]
pub enum Prepared {
    /// Resolved without contacting the provider (query too short)
    Immediate(TaggedOutcome),
    /// Needs a provider call via [`Dispatcher::execute`]
    Dispatch(SearchRequest),
}

impl Prepared {
    pub fn generation(&self) -> Generation {
        match self {
            Prepared::Immediate(outcome) => outcome.generation,
            Prepared::Dispatch(request) => request.generation,
        }
    }
}

/// Sends searches to one provider and discards superseded outcomes.
///
/// Each search screen owns its own dispatcher, so counters never interfere
/// across screens. `submit` may be called concurrently from several tasks.
#[derive(Debug)]
pub struct Dispatcher<P: ?Sized> {
    generation: AtomicU64,
    timeout: Duration,
    min_query_len: usize,
    provider: Arc<P>,
}

impl<P: ?Sized> Dispatcher<P> {
    /// The most recently issued generation
    pub fn current_generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current_generation() == generation
    }

    /// Make every in-flight request stale
    pub fn invalidate(&self) -> Generation {
        self.next_generation()
    }

    fn next_generation(&self) -> Generation {
        Generation(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl<P: SearchProvider + ?Sized> Dispatcher<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            generation: AtomicU64::new(0),
            timeout: DEFAULT_TIMEOUT,
            min_query_len: MIN_QUERY_LEN,
            provider,
        }
    }

    /// Bound every provider call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_min_query_len(mut self, min_query_len: usize) -> Self {
        self.min_query_len = min_query_len;
        self
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn min_query_len(&self) -> usize {
        self.min_query_len
    }

    /// Assign a generation to `input`. Text too short to search resolves
    /// immediately to an empty success; it still supersedes older requests.
    pub fn prepare(&self, input: impl Into<SearchInput>) -> Prepared {
        let input = input.into();
        let generation = self.next_generation();

        if let SearchInput::Text(ref query) = input {
            if !query.is_dispatchable(self.min_query_len) {
                tracing::debug!(
                    "{} query {:?} below {} characters, not dispatched",
                    generation,
                    query.trimmed(),
                    self.min_query_len
                );
                return Prepared::Immediate(TaggedOutcome::new(
                    generation,
                    SearchOutcome::Success(Vec::new()),
                ));
            }
        }

        Prepared::Dispatch(SearchRequest { generation, input })
    }

    /// Run a prepared request against the provider. Returns `None` when a
    /// newer submission superseded it while the provider was working.
    pub async fn execute(&self, request: SearchRequest) -> Option<TaggedOutcome> {
        let SearchRequest { generation, input } = request;
        tracing::debug!(
            "{} dispatching {} to {}",
            generation,
            input.describe(),
            self.provider.name()
        );

        let outcome = match tokio::time::timeout(self.timeout, self.call(&input)).await {
            Ok(Ok(records)) => SearchOutcome::Success(normalize_all(&records)),
            Ok(Err(err)) => {
                let kind = if err.is_decode() {
                    FailureKind::Decode
                } else {
                    FailureKind::Transport
                };
                SearchOutcome::Failure(SearchFailure::new(kind, err.to_string()))
            }
            Err(_) => SearchOutcome::Failure(SearchFailure::new(
                FailureKind::Timeout,
                format!("no response within {:?}", self.timeout),
            )),
        };

        self.deliver(TaggedOutcome::new(generation, outcome))
    }

    /// [`prepare`](Self::prepare) then [`execute`](Self::execute)
    pub async fn submit(&self, input: impl Into<SearchInput>) -> Option<TaggedOutcome> {
        match self.prepare(input) {
            Prepared::Immediate(outcome) => self.deliver(outcome),
            Prepared::Dispatch(request) => self.execute(request).await,
        }
    }

    async fn call(&self, input: &SearchInput) -> Result<Vec<RawRecord>, ProviderError> {
        match input {
            SearchInput::Text(query) => self.provider.search(query).await,
            SearchInput::Image(image) => self.provider.search_by_image(image).await,
        }
    }

    fn deliver(&self, tagged: TaggedOutcome) -> Option<TaggedOutcome> {
        // read the counter now, not before the provider call
        let current = self.current_generation();
        if tagged.generation != current {
            tracing::trace!(
                "{} superseded by {}, discarding outcome",
                tagged.generation,
                current
            );
            return None;
        }

        match &tagged.outcome {
            SearchOutcome::Success(results) => {
                tracing::debug!("{} settled with {} results", tagged.generation, results.len());
            }
            SearchOutcome::Failure(failure) => {
                tracing::warn!(
                    "{} search failed via {} ({}): {}",
                    tagged.generation,
                    self.provider.name(),
                    failure.kind,
                    failure.detail
                );
            }
        }
        Some(tagged)
    }
}
