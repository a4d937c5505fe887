//! Core data models for queries, provider records and search outcomes.

mod outcome;
mod query;
mod record;
mod result;

pub use outcome::{FailureKind, SearchFailure, SearchOutcome, TaggedOutcome, SEARCH_FAILED_MESSAGE};
pub use query::{
    DateRange, Generation, ImageFormat, ImageQuery, Query, SearchFilters, SearchInput,
    SearchRequest, ValidationError, MAX_IMAGE_BYTES, MIN_QUERY_LEN,
};
pub(crate) use record::ResultsEnvelope;
pub use record::{ImageRecord, PatentDetails, RawRecord, RecordId, TextRecord};
pub use result::{ResultKind, SearchResult};
