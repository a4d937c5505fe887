//! Full-text search over a JSON HTTP endpoint.

use async_trait::async_trait;
use url::Url;

use crate::models::{Query, RawRecord, TextRecord};
use crate::providers::{decode_results, ProviderError, SearchProvider};
use crate::utils::HttpClient;

/// Full-text patent/trademark provider.
///
/// Issues `GET {endpoint}?q=..&type=..&limit=..` plus one parameter per set
/// filter and expects `{"results": [...]}` back.
#[derive(Debug, Clone)]
pub struct HttpTextProvider {
    client: HttpClient,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpTextProvider {
    pub fn new(client: HttpClient, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            api_key: None,
        }
    }

    /// Send the key as `x-api-key` on every request
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    fn build_url(&self, query: &Query) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query.trimmed())
                .append_pair("type", query.kind.as_str())
                .append_pair("limit", &query.max_results.to_string());
            for (key, value) in query.filters.to_params() {
                pairs.append_pair(key, &value);
            }
        }
        url
    }
}

#[async_trait]
impl SearchProvider for HttpTextProvider {
    fn id(&self) -> &str {
        "text"
    }

    fn name(&self) -> &str {
        "Full-text search"
    }

    async fn search(&self, query: &Query) -> Result<Vec<RawRecord>, ProviderError> {
        let url = self.build_url(query);
        tracing::debug!("GET {}", url);

        let mut request = self.client.client().get(url);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to reach text provider: {}", e)))?;

        let records: Vec<TextRecord> = decode_results(response, self.name()).await?;
        Ok(records.into_iter().map(RawRecord::Text).collect())
    }
}
