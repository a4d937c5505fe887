//! Supporting utilities.
//!
//! - [`HttpClient`]: shared HTTP client used by the HTTP providers
//! - [`SearchHistory`]: JSON-lines log of saved searches
//! - [`results_table`], [`format_plain`]: terminal rendering of results
//!
//! # Search History
//!
//! ```rust,no_run
//! use patent_search::models::{ResultKind, SearchFilters};
//! use patent_search::utils::{SavedSearch, SearchHistory};
//!
//! # fn example() -> Result<(), patent_search::utils::HistoryError> {
//! let history = SearchHistory::new("/tmp/history.jsonl");
//! history.record(&SavedSearch::text("solar panel", ResultKind::Patent, SearchFilters::new(), 3))?;
//! for entry in history.recent(10)? {
//!     println!("{} ({} results)", entry.query, entry.result_count);
//! }
//! # Ok(())
//! # }
//! ```

mod display;
mod history;
mod http;

pub use display::{
    format_plain, format_score, history_table, results_table, terminal_width,
    truncate_with_ellipsis, DEFAULT_WIDTH,
};
pub use history::{HistoryError, SavedSearch, SearchHistory};
pub use http::HttpClient;
