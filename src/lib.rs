//! # Patent Search
//!
//! A debounced, cancellable search client for patent and trademark
//! records, by text or by image.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (Query, ImageQuery, SearchResult, etc.)
//! - [`providers`]: Search backends behind the [`SearchProvider`] trait
//! - [`search`]: Debouncing, generation-tagged dispatch, normalization and
//!   per-screen session state
//! - [`utils`]: HTTP client, search history and terminal rendering
//! - [`config`]: Configuration management

pub mod config;
pub mod models;
pub mod providers;
pub mod search;
pub mod utils;

// Re-export commonly used types
pub use models::{ImageQuery, Query, SearchFilters, SearchOutcome, SearchResult};
pub use providers::{ProviderError, SearchProvider};
pub use search::{Dispatcher, InputHandle, SearchSession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
