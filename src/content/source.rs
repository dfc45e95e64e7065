//! Content source adapters.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::content::Document;
use crate::error::SourceError;

/// The upstream document API.
///
/// Retries, if any, belong to the implementation; the cache calls `load`
/// at most once per miss.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn load(&self, id: &str) -> Result<Document, SourceError>;
}

// == HTTP Source ==
/// Fetches `GET {base_url}/documents/{id}` and decodes the JSON body.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn load(&self, id: &str) -> Result<Document, SourceError> {
        let url = format!("{}/documents/{}", self.base_url, id);
        debug!(url = %url, "loading document from content source");

        let response = self.client.get(&url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(SourceError::NotFound(id.to_string())),
            status if !status.is_success() => Err(SourceError::Status {
                id: id.to_string(),
                status: status.as_u16(),
            }),
            _ => Ok(response.json::<Document>().await?),
        }
    }
}
