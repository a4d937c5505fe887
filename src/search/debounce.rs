//! Keystroke debouncing.
//!
//! A [`Debouncer`] turns a burst of edits into a single [`DebounceEvent`]
//! once the input has been quiet for the configured period. It keeps at most
//! one timer armed; every new value replaces it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Default quiet period before a value is committed
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Emitted when the input has settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceEvent {
    /// The latest value is long enough to search for
    Commit(String),
    /// The latest value is too short; displayed results should be cleared
    Clear,
}

/// Single-timer debouncer. Must be used from within a tokio runtime.
///
/// Dropping the debouncer cancels any pending timer; no event is emitted
/// after [`Debouncer::cancel`] or drop, even if the timer has already fired
/// and its task is about to send.
#[derive(Debug)]
pub struct Debouncer {
    quiet_period: Duration,
    min_len: usize,
    tx: mpsc::UnboundedSender<DebounceEvent>,
    // bumped on every push/cancel; a timer only sends if its epoch is still current
    epoch: Arc<Mutex<u64>>,
    pending: Option<JoinHandle<()>>,
}

fn lock(epoch: &Mutex<u64>) -> MutexGuard<'_, u64> {
    epoch.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Debouncer {
    /// Create a debouncer and the receiver its events are delivered on
    pub fn new(
        quiet_period: Duration,
        min_len: usize,
    ) -> (Self, mpsc::UnboundedReceiver<DebounceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            quiet_period,
            min_len,
            tx,
            epoch: Arc::new(Mutex::new(0)),
            pending: None,
        };
        (debouncer, rx)
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Record a new input value, restarting the quiet period
    pub fn push(&mut self, value: impl Into<String>) {
        let value = value.into();
        let epoch = self.advance();

        let tx = self.tx.clone();
        let state = Arc::clone(&self.epoch);
        let quiet_period = self.quiet_period;
        let min_len = self.min_len;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;

            let current = lock(&state);
            if *current != epoch {
                return;
            }

            let event = if value.trim().chars().count() < min_len {
                DebounceEvent::Clear
            } else {
                DebounceEvent::Commit(value)
            };
            tracing::trace!("debounce fired: {:?}", event);
            // receiver gone means nobody is listening any more
            let _ = tx.send(event);
        }));
    }

    /// Disarm the pending timer, if any
    pub fn cancel(&mut self) {
        self.advance();
    }

    /// Whether a timer is armed and has not fired yet
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn advance(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let mut epoch = lock(&self.epoch);
        *epoch += 1;
        *epoch
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
