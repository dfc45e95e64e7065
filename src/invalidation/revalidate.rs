//! Revalidation sink: a downstream static-regeneration trigger.

use async_trait::async_trait;
use tracing::{debug, warn};

/// Best-effort downstream notification after invalidation.
#[async_trait]
pub trait RevalidationSink: Send + Sync {
    /// Asks the sink to regenerate `path`. Returns whether it accepted.
    async fn revalidate(&self, path: &str) -> bool;
}

// == HTTP Sink ==
/// Calls `POST {url}?path={path}&secret={secret}`.
#[derive(Debug, Clone)]
pub struct HttpRevalidationSink {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
}

impl HttpRevalidationSink {
    pub fn new(url: impl Into<String>, secret: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url, secret)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            secret,
        }
    }
}

#[async_trait]
impl RevalidationSink for HttpRevalidationSink {
    async fn revalidate(&self, path: &str) -> bool {
        let mut query = vec![("path", path)];
        if let Some(secret) = self.secret.as_deref() {
            query.push(("secret", secret));
        }

        match self.client.post(&self.url).query(&query).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(path = %path, "revalidation accepted");
                true
            }
            Ok(response) => {
                warn!(path = %path, status = %response.status(), "revalidation rejected");
                false
            }
            Err(err) => {
                warn!(path = %path, error = %err, "revalidation request failed");
                false
            }
        }
    }
}
