//! Image-similarity search over a JSON HTTP endpoint.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::models::{ImageQuery, ImageRecord, RawRecord};
use crate::providers::{decode_results, ProviderError, SearchProvider};
use crate::utils::HttpClient;

/// Uploads the image as multipart field `image` and expects
/// `{"results": [...]}` with a similarity score per record.
#[derive(Debug, Clone)]
pub struct HttpImageProvider {
    client: HttpClient,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpImageProvider {
    pub fn new(client: HttpClient, endpoint: Url) -> Self {
        Self {
            client,
            endpoint,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

#[async_trait]
impl SearchProvider for HttpImageProvider {
    fn id(&self) -> &str {
        "image"
    }

    fn name(&self) -> &str {
        "Image similarity search"
    }

    async fn search_by_image(&self, image: &ImageQuery) -> Result<Vec<RawRecord>, ProviderError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(image.file_name().to_string())
            .mime_str(image.format().mime_type())?;
        let form = Form::new().part("image", part);

        tracing::debug!(
            "POST {} ({} bytes, {})",
            self.endpoint,
            image.bytes().len(),
            image.format()
        );

        let mut request = self.client.client().post(self.endpoint.clone()).multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Failed to reach image provider: {}", e)))?;

        let records: Vec<ImageRecord> = decode_results(response, self.name()).await?;
        Ok(records.into_iter().map(RawRecord::Image).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Query;
    use mockito::Matcher;

    fn gif() -> ImageQuery {
        ImageQuery::new(b"GIF89a0000".to_vec(), "device.gif").unwrap()
    }

    #[tokio::test]
    async fn test_image_search_uploads_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/image-search")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::Regex(r#"name="image"; filename="device.gif""#.to_string()))
            .with_status(200)
            .with_body(
                r#"{"results": [{
                    "id": "1",
                    "title": "Smart Device Design Pattern",
                    "number": "US20230123456",
                    "similarityScore": 0.95,
                    "imageUrl": "https://example.com/1.png"
                }]}"#,
            )
            .create_async()
            .await;

        let endpoint = Url::parse(&format!("{}/image-search", server.url())).unwrap();
        let provider = HttpImageProvider::new(HttpClient::new().unwrap(), endpoint);
        let records = provider.search_by_image(&gif()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Image(r) => assert_eq!(r.similarity_score, Some(0.95)),
            other => panic!("expected image record, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_text_search_is_not_supported() {
        let provider = HttpImageProvider::new(
            HttpClient::new().unwrap(),
            Url::parse("http://127.0.0.1:9/image-search").unwrap(),
        );
        assert_eq!(
            provider.search(&Query::new("solar")).await,
            Err(ProviderError::NotImplemented)
        );
    }
}
