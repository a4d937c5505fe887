//! Search query, filter and request models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::ResultKind;

/// Minimum number of significant characters before a text query is dispatched
pub const MIN_QUERY_LEN: usize = 2;

/// Largest image accepted for similarity search (10 MiB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Errors raised while building a query locally, before any provider is involved
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Query too short: needs at least {min} characters")]
    QueryTooShort { min: usize },

    #[error("Image is empty")]
    EmptyImage,

    #[error("Image too large: {size} bytes (limit {limit})")]
    ImageTooLarge { size: usize, limit: usize },

    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: String, end: String },
}

/// Optional filing date bounds; either side may be open
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl DateRange {
    /// Build a range, checking both bounds parse and are ordered
    pub fn new(start: Option<&str>, end: Option<&str>) -> Result<Self, ValidationError> {
        let start = start.map(parse_date).transpose()?;
        let end = end.map(parse_date).transpose()?;

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ValidationError::InvalidDateRange {
                    start: s.to_string(),
                    end: e.to_string(),
                });
            }
        }

        Ok(Self {
            start: start.map(|d| d.format("%Y-%m-%d").to_string()),
            end: end.map(|d| d.format("%Y-%m-%d").to_string()),
        })
    }

    /// True when neither bound is set
    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Filters narrowing a text search. Every field is optional and an unset
/// field imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,

    /// Jurisdiction code such as `US`, `EP` or `IN`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl SearchFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = (!range.is_open()).then_some(range);
        self
    }

    pub fn jurisdiction(mut self, code: impl AsRef<str>) -> Self {
        self.jurisdiction = non_blank(code.as_ref()).map(|c| c.to_uppercase());
        self
    }

    pub fn category(mut self, category: impl AsRef<str>) -> Self {
        self.category = non_blank(category.as_ref()).map(str::to_string);
        self
    }

    pub fn status(mut self, status: impl AsRef<str>) -> Self {
        self.status = non_blank(status.as_ref()).map(str::to_string);
        self
    }

    /// True when no filter is set
    pub fn is_empty(&self) -> bool {
        self.date_range.is_none()
            && self.jurisdiction.is_none()
            && self.category.is_none()
            && self.status.is_none()
    }

    /// Query-string pairs for the set filters, in a stable order
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref j) = self.jurisdiction {
            params.push(("jurisdiction", j.clone()));
        }
        if let Some(ref c) = self.category {
            params.push(("category", c.clone()));
        }
        if let Some(ref s) = self.status {
            params.push(("status", s.clone()));
        }
        if let Some(ref range) = self.date_range {
            if let Some(ref start) = range.start {
                params.push(("from", start.clone()));
            }
            if let Some(ref end) = range.end {
                params.push(("to", end.clone()));
            }
        }
        params
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// A text search query. Immutable once submitted; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Query {
    /// Raw text as typed
    pub text: String,

    /// Requested record kind
    #[serde(default)]
    pub kind: ResultKind,

    #[serde(default)]
    pub filters: SearchFilters,

    /// Cap on records requested from the provider
    pub max_results: usize,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            text: String::new(),
            kind: ResultKind::Patent,
            filters: SearchFilters::default(),
            max_results: 20,
        }
    }
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn kind(mut self, kind: ResultKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// The text with surrounding whitespace removed
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Number of significant characters
    pub fn significant_len(&self) -> usize {
        self.trimmed().chars().count()
    }

    /// Whether the query is long enough to be sent to a provider
    pub fn is_dispatchable(&self, min_len: usize) -> bool {
        self.significant_len() >= min_len
    }

    /// Check the query against the minimum length
    pub fn validate(&self, min_len: usize) -> Result<(), ValidationError> {
        if self.is_dispatchable(min_len) {
            Ok(())
        } else {
            Err(ValidationError::QueryTooShort { min: min_len })
        }
    }
}

/// Supported image encodings for similarity search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Detect the format from the leading bytes of the file
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageFormat::Gif)
        } else {
            None
        }
    }

    /// Guess the format from a file extension
    pub fn from_extension(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// An image submitted for similarity search
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ImageQuery {
    bytes: Vec<u8>,
    file_name: String,
    format: ImageFormat,
}

impl ImageQuery {
    /// Validate and wrap image bytes
    pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Result<Self, ValidationError> {
        let file_name = file_name.into();

        if bytes.is_empty() {
            return Err(ValidationError::EmptyImage);
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::ImageTooLarge {
                size: bytes.len(),
                limit: MAX_IMAGE_BYTES,
            });
        }

        let format = ImageFormat::sniff(&bytes)
            .or_else(|| ImageFormat::from_extension(&file_name))
            .ok_or_else(|| ValidationError::UnsupportedImage(file_name.clone()))?;

        Ok(Self {
            bytes,
            file_name,
            format,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }
}

impl fmt::Debug for ImageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageQuery")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Anything the dispatcher can send to a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchInput {
    Text(Query),
    Image(ImageQuery),
}

impl SearchInput {
    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            SearchInput::Text(q) => format!("text {:?}", q.trimmed()),
            SearchInput::Image(img) => format!("image {} ({})", img.file_name(), img.format()),
        }
    }
}

impl From<Query> for SearchInput {
    fn from(query: Query) -> Self {
        SearchInput::Text(query)
    }
}

impl From<ImageQuery> for SearchInput {
    fn from(image: ImageQuery) -> Self {
        SearchInput::Image(image)
    }
}

/// Monotonic sequence number identifying one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A search input tagged with the generation it was submitted under
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub generation: Generation,
    pub input: SearchInput,
}
