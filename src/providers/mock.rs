//! Mock provider for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::models::{ImageQuery, Query, RawRecord, TextRecord};
use crate::providers::{ProviderError, SearchProvider};

/// A scripted reply: records or an error, delivered after an optional delay.
#[derive(Debug, Clone)]
pub struct MockResponse {
    result: Result<Vec<RawRecord>, ProviderError>,
    delay: Duration,
}

impl MockResponse {
    pub fn records(records: Vec<RawRecord>) -> Self {
        Self {
            result: Ok(records),
            delay: Duration::ZERO,
        }
    }

    pub fn error(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    /// Hold the reply back for `delay` before answering
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::records(Vec::new())
    }
}

/// A mock provider that returns predefined responses and records every call.
///
/// Text responses are keyed by the trimmed query text; anything without a
/// scripted response gets the default (an empty list unless overridden).
#[derive(Debug, Default)]
pub struct MockProvider {
    text_responses: Mutex<HashMap<String, MockResponse>>,
    default_response: Mutex<MockResponse>,
    image_response: Mutex<Option<MockResponse>>,
    calls: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockProvider {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `query` with `records`.
    pub fn respond_to(&self, query: &str, records: Vec<RawRecord>) {
        self.respond_with(query, MockResponse::records(records));
    }

    /// Answer `query` with a fully scripted response.
    pub fn respond_with(&self, query: &str, response: MockResponse) {
        lock(&self.text_responses).insert(query.trim().to_string(), response);
    }

    /// Response for text queries with nothing scripted.
    pub fn set_default_response(&self, response: MockResponse) {
        *lock(&self.default_response) = response;
    }

    /// Response for image searches; unset means image search is unsupported.
    pub fn set_image_response(&self, response: MockResponse) {
        *lock(&self.image_response) = Some(response);
    }

    /// Every call so far, in order. Text calls are the trimmed query,
    /// image calls are `image:<file name>`.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    async fn reply(response: MockResponse) -> Result<Vec<RawRecord>, ProviderError> {
        if !response.delay.is_zero() {
            tokio::time::sleep(response.delay).await;
        }
        response.result
    }
}

#[async_trait]
impl SearchProvider for MockProvider {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Provider"
    }

    async fn search(&self, query: &Query) -> Result<Vec<RawRecord>, ProviderError> {
        let key = query.trimmed().to_string();
        lock(&self.calls).push(key.clone());

        let response = lock(&self.text_responses)
            .get(&key)
            .cloned()
            .unwrap_or_else(|| lock(&self.default_response).clone());

        Self::reply(response).await
    }

    async fn search_by_image(&self, image: &ImageQuery) -> Result<Vec<RawRecord>, ProviderError> {
        lock(&self.calls).push(format!("image:{}", image.file_name()));

        let response = lock(&self.image_response).clone();
        match response {
            Some(response) => Self::reply(response).await,
            None => Err(ProviderError::NotImplemented),
        }
    }
}

/// Helper function to create a text record for testing.
pub fn make_record(id: &str, title: &str) -> RawRecord {
    let mut record = TextRecord::new(id);
    record.title = Some(title.to_string());
    record.number = Some(format!("US{}", id));
    record.status = Some("Active".to_string());
    RawRecord::Text(record)
}
