//! The search pipeline between a search box and a provider.
//!
//! - [`Debouncer`]: collapses keystroke bursts into one commit
//! - [`Dispatcher`]: tags each search with a generation and drops outcomes
//!   that were superseded while in flight
//! - [`normalize`]: maps raw provider records to [`SearchResult`](crate::models::SearchResult)
//! - [`SearchSession`]: the state one search screen displays
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use patent_search::providers::MockProvider;
//! use patent_search::search::{Dispatcher, SearchSession, DEFAULT_QUIET_PERIOD};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = Arc::new(MockProvider::new());
//! let (session, _notifications) = SearchSession::new(Dispatcher::new(provider));
//! let mut input = session.attach_input(DEFAULT_QUIET_PERIOD);
//! input.input("solar panel");
//! # }
//! ```

mod debounce;
mod dispatch;
mod normalize;
mod session;

pub use debounce::{DebounceEvent, Debouncer, DEFAULT_QUIET_PERIOD};
pub use dispatch::{Dispatcher, Prepared, DEFAULT_TIMEOUT};
pub use normalize::{clean_text, normalize, normalize_all, DEFAULT_STATUS, DEFAULT_TITLE};
pub use session::{InputHandle, Notification, SearchSession, SessionState, SessionView, Settlement};
