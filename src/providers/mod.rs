//! Search provider plugins.
//!
//! This module defines the [`SearchProvider`] trait that every search backend
//! implements. A provider exposes one capability in two flavours: full-text
//! search over a [`Query`] and similarity search over an [`ImageQuery`]. Both
//! return the provider's raw records in the order the provider ranked them;
//! normalization happens later in [`crate::search::normalize`].
//!
//! # Built-in Providers
//!
//! - [`HttpTextProvider`] - JSON full-text endpoint (`GET`)
//! - [`HttpImageProvider`] - JSON image-similarity endpoint (multipart `POST`)
//! - [`MockProvider`] - scripted in-memory provider for tests and demos
//!
//! # Implementing a New Provider
//!
//! 1. Create a struct that implements `SearchProvider`
//! 2. Implement `id`, `name` and whichever of `search` / `search_by_image`
//!    the backend supports; the other keeps its `NotImplemented` default
//! 3. Hand it to a [`crate::search::Dispatcher`]

mod image;
pub mod mock;
mod text;

pub use image::HttpImageProvider;
pub use mock::{MockProvider, MockResponse};
pub use text::HttpTextProvider;

use crate::models::{ImageQuery, Query, RawRecord, ResultsEnvelope};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// The SearchProvider trait defines the interface for all search backends.
#[async_trait]
pub trait SearchProvider: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this provider (e.g. "text", "image", "mock")
    fn id(&self) -> &str;

    /// Human-readable name of this provider
    fn name(&self) -> &str;

    /// Full-text search. Records come back in provider ranking order.
    async fn search(&self, _query: &Query) -> Result<Vec<RawRecord>, ProviderError> {
        Err(ProviderError::NotImplemented)
    }

    /// Similarity search by image
    async fn search_by_image(&self, _image: &ImageQuery) -> Result<Vec<RawRecord>, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}

/// Errors that can occur when talking to a provider
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// The requested operation is not implemented for this provider
    #[error("Operation not implemented for this provider")]
    NotImplemented,

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Payload did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Non-success status from the provider
    #[error("API error: {0}")]
    Api(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Whether the provider answered but with a payload we could not decode
    pub fn is_decode(&self) -> bool {
        matches!(self, ProviderError::Parse(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Parse(format!("JSON: {}", err))
    }
}

/// Check the status of a provider response and decode its `results` list
pub(crate) async fn decode_results<T: DeserializeOwned>(
    response: reqwest::Response,
    provider: &str,
) -> Result<Vec<T>, ProviderError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimit);
    }
    if !status.is_success() {
        return Err(ProviderError::Api(format!(
            "{} returned status: {}",
            provider, status
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Network(format!("Failed to read {} response: {}", provider, e)))?;

    let envelope: ResultsEnvelope<T> = serde_json::from_str(&body)?;
    Ok(envelope.results)
}
