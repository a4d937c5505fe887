//! Per-screen search state.
//!
//! A [`SearchSession`] owns a dispatcher and the state a search screen
//! displays: `Idle`, `Pending` while a request is out, and `Settled` once
//! the current generation's outcome arrives. Overlapping requests may re-enter
//! `Pending`; only the outcome of the newest generation moves it out again.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::models::{
    Generation, Query, ResultKind, SearchFailure, SearchFilters, SearchInput, SearchOutcome,
    SearchResult, TaggedOutcome,
};
use crate::providers::SearchProvider;
use crate::search::debounce::{DebounceEvent, Debouncer};
use crate::search::dispatch::{Dispatcher, Prepared};

/// How a settled search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Pending {
        generation: Generation,
    },
    Settled {
        generation: Generation,
        settlement: Settlement,
    },
}

/// What a search screen shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    pub state: SessionState,
    pub results: Vec<SearchResult>,
    pub last_failure: Option<SearchFailure>,
}

/// A transient user-facing message, e.g. a toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub generation: Generation,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

struct SessionInner<P: ?Sized> {
    dispatcher: Arc<Dispatcher<P>>,
    view: watch::Sender<SessionView>,
    notifications: mpsc::UnboundedSender<Notification>,
    // kind, filters and limit applied to debounced commits
    template: Mutex<Query>,
}

/// Search state for one screen. Cheap to clone; clones share state.
pub struct SearchSession<P: ?Sized> {
    inner: Arc<SessionInner<P>>,
}

impl<P: ?Sized> Clone for SearchSession<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: ?Sized> fmt::Debug for SearchSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSession")
            .field("view", &*self.inner.view.borrow())
            .finish()
    }
}

fn lock(template: &Mutex<Query>) -> MutexGuard<'_, Query> {
    template.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<P: SearchProvider + ?Sized + 'static> SearchSession<P> {
    /// Create a session and the receiver for its notifications
    pub fn new(dispatcher: Dispatcher<P>) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (notifications, rx) = mpsc::unbounded_channel();
        let (view, _) = watch::channel(SessionView::default());
        let session = Self {
            inner: Arc::new(SessionInner {
                dispatcher: Arc::new(dispatcher),
                view,
                notifications,
                template: Mutex::new(Query::default()),
            }),
        };
        (session, rx)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<P>> {
        &self.inner.dispatcher
    }

    /// Watch the view for changes
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.inner.view.subscribe()
    }

    pub fn snapshot(&self) -> SessionView {
        self.inner.view.borrow().clone()
    }

    pub fn set_filters(&self, filters: SearchFilters) {
        lock(&self.inner.template).filters = filters;
    }

    pub fn filters(&self) -> SearchFilters {
        lock(&self.inner.template).filters.clone()
    }

    pub fn set_kind(&self, kind: ResultKind) {
        lock(&self.inner.template).kind = kind;
    }

    pub fn set_max_results(&self, max_results: usize) {
        lock(&self.inner.template).max_results = max_results;
    }

    /// Build a query for `text` using the session's kind, filters and limit
    pub fn query_for(&self, text: impl Into<String>) -> Query {
        Query {
            text: text.into(),
            ..lock(&self.inner.template).clone()
        }
    }

    /// Submit a search and apply its outcome if it is still the newest.
    /// Returns the applied outcome, or `None` if it was superseded.
    pub async fn submit(&self, input: impl Into<SearchInput>) -> Option<TaggedOutcome> {
        let dispatcher = &self.inner.dispatcher;
        let tagged = match dispatcher.prepare(input) {
            Prepared::Immediate(outcome) => {
                self.reset(outcome.generation);
                return dispatcher.is_current(outcome.generation).then_some(outcome);
            }
            Prepared::Dispatch(request) => {
                self.mark_pending(request.generation);
                dispatcher.execute(request).await?
            }
        };
        self.apply(tagged)
    }

    /// Drop displayed results and make everything in flight stale
    pub fn clear(&self) {
        let generation = self.inner.dispatcher.invalidate();
        self.reset(generation);
    }

    /// Start feeding keystrokes through a debouncer with the given quiet
    /// period. Dropping the returned handle tears the input down.
    pub fn attach_input(&self, quiet_period: Duration) -> InputHandle<P> {
        let (debouncer, events) =
            Debouncer::new(quiet_period, self.inner.dispatcher.min_query_len());
        let consumer = tokio::spawn(Self::consume(self.clone(), events));
        InputHandle {
            session: self.clone(),
            debouncer,
            consumer,
        }
    }

    async fn consume(session: Self, mut events: mpsc::UnboundedReceiver<DebounceEvent>) {
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(DebounceEvent::Commit(text)) => {
                        let query = session.query_for(text);
                        let session = session.clone();
                        in_flight.spawn(async move {
                            session.submit(query).await;
                        });
                    }
                    Some(DebounceEvent::Clear) => session.clear(),
                    None => break,
                },
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }
        while in_flight.join_next().await.is_some() {}
    }

    fn reset(&self, generation: Generation) {
        let dispatcher = &self.inner.dispatcher;
        self.inner.view.send_if_modified(|view| {
            if !dispatcher.is_current(generation) {
                return false;
            }
            *view = SessionView::default();
            true
        });
    }

    fn mark_pending(&self, generation: Generation) {
        let dispatcher = &self.inner.dispatcher;
        self.inner.view.send_if_modified(|view| {
            if !dispatcher.is_current(generation) {
                return false;
            }
            view.state = SessionState::Pending { generation };
            true
        });
    }

    fn apply(&self, tagged: TaggedOutcome) -> Option<TaggedOutcome> {
        let dispatcher = &self.inner.dispatcher;
        let generation = tagged.generation;
        let mut applied = false;

        self.inner.view.send_if_modified(|view| {
            if !dispatcher.is_current(generation) {
                return false;
            }
            match &tagged.outcome {
                SearchOutcome::Success(results) => {
                    view.results = results.clone();
                    view.last_failure = None;
                    view.state = SessionState::Settled {
                        generation,
                        settlement: Settlement::Success,
                    };
                }
                SearchOutcome::Failure(failure) => {
                    view.results.clear();
                    view.last_failure = Some(failure.clone());
                    view.state = SessionState::Settled {
                        generation,
                        settlement: Settlement::Failure,
                    };
                }
            }
            applied = true;
            true
        });

        if !applied {
            return None;
        }

        if let SearchOutcome::Failure(ref failure) = tagged.outcome {
            // nobody listening is fine, the view still carries the failure
            let _ = self.inner.notifications.send(Notification {
                generation,
                message: failure.message.clone(),
            });
        }
        Some(tagged)
    }
}

/// Scoped keystroke input for a session.
///
/// Owns the debouncer and the task turning its commits into searches.
/// Dropping the handle cancels the pending timer, aborts the task along with
/// any provider calls it started, and invalidates whatever is still in
/// flight so nothing lands on the screen afterwards.
pub struct InputHandle<P: ?Sized> {
    session: SearchSession<P>,
    debouncer: Debouncer,
    consumer: JoinHandle<()>,
}

impl<P: SearchProvider + ?Sized + 'static> InputHandle<P> {
    /// The search box now contains `text`
    pub fn input(&mut self, text: impl Into<String>) {
        self.debouncer.push(text);
    }

    /// Forget the pending keystrokes without tearing down
    pub fn cancel_pending(&mut self) {
        self.debouncer.cancel();
    }

    pub fn session(&self) -> &SearchSession<P> {
        &self.session
    }
}

impl<P: ?Sized> fmt::Debug for InputHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputHandle")
            .field("debouncer", &self.debouncer)
            .finish()
    }
}

impl<P: ?Sized> Drop for InputHandle<P> {
    fn drop(&mut self) {
        self.debouncer.cancel();
        self.consumer.abort();
        self.session.inner.dispatcher.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureKind, SEARCH_FAILED_MESSAGE};
    use crate::providers::mock::make_record;
    use crate::providers::{MockProvider, MockResponse};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn session(
        mock: &Arc<MockProvider>,
    ) -> (SearchSession<MockProvider>, mpsc::UnboundedReceiver<Notification>) {
        SearchSession::new(Dispatcher::new(Arc::clone(mock)).with_timeout(Duration::from_secs(10)))
    }

    #[tokio::test]
    async fn test_success_settles_with_results() {
        let mock = Arc::new(MockProvider::new());
        mock.respond_to("drone", vec![make_record("1", "Drone frame")]);
        let (session, _rx) = session(&mock);

        assert_eq!(session.snapshot().state, SessionState::Idle);
        session.submit(Query::new("drone")).await.unwrap();

        let view = session.snapshot();
        assert_eq!(view.results.len(), 1);
        assert_eq!(
            view.state,
            SessionState::Settled {
                generation: Generation(1),
                settlement: Settlement::Success
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_until_newest_settles() {
        let mock = Arc::new(MockProvider::new());
        mock.respond_with(
            "slow",
            MockResponse::records(vec![make_record("s", "Slow")]).delay(ms(1000)),
        );
        mock.respond_with(
            "fast",
            MockResponse::records(vec![make_record("f", "Fast")]).delay(ms(300)),
        );
        let (session, _rx) = session(&mock);
        let mut view = session.subscribe();

        let newer = session.clone();
        let (older, newest) = tokio::join!(session.submit(Query::new("fast")), async move {
            tokio::time::sleep(ms(100)).await;
            newer.submit(Query::new("slow")).await
        });

        // "fast" answered first but was already superseded by "slow"
        assert!(older.is_none());
        assert!(newest.is_some());
        let current = view.borrow_and_update().clone();
        assert_eq!(current.results[0].id, "s");
        assert_eq!(
            current.state,
            SessionState::Settled {
                generation: Generation(2),
                settlement: Settlement::Success
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_clears_results_and_notifies_once() {
        let mock = Arc::new(MockProvider::new());
        mock.respond_to("solar", vec![make_record("1", "Solar")]);
        mock.respond_with(
            "stuck",
            MockResponse::default().delay(Duration::from_secs(60)),
        );
        let (session, mut rx) = session(&mock);

        session.submit(Query::new("solar")).await.unwrap();
        assert_eq!(session.snapshot().results.len(), 1);

        let tagged = session.submit(Query::new("stuck")).await.unwrap();
        assert_eq!(tagged.outcome.failure().unwrap().kind, FailureKind::Timeout);

        let view = session.snapshot();
        assert!(view.results.is_empty());
        assert_eq!(view.last_failure.unwrap().kind, FailureKind::Timeout);

        let note = rx.recv().await.unwrap();
        assert_eq!(note.message, SEARCH_FAILED_MESSAGE);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_short_query_resets_to_idle() {
        let mock = Arc::new(MockProvider::new());
        mock.respond_to("ab", vec![make_record("1", "AB")]);
        let (session, _rx) = session(&mock);

        session.submit(Query::new("ab")).await.unwrap();
        let tagged = session.submit(Query::new("a")).await.unwrap();

        assert_eq!(tagged.outcome, SearchOutcome::Success(Vec::new()));
        assert_eq!(session.snapshot(), SessionView::default());
        assert_eq!(mock.calls(), vec!["ab"]);
    }

    #[tokio::test]
    async fn test_query_for_uses_session_filters() {
        let mock = Arc::new(MockProvider::new());
        let (session, _rx) = session(&mock);
        session.set_filters(SearchFilters::new().jurisdiction("in"));
        session.set_kind(ResultKind::Trademark);

        let query = session.query_for("tea brand");
        assert_eq!(query.text, "tea brand");
        assert_eq!(query.kind, ResultKind::Trademark);
        assert_eq!(query.filters.jurisdiction.as_deref(), Some("IN"));
    }
}
