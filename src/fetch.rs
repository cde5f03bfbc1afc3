//! Network fetching of image payloads

use crate::config::HttpConfig;
use crate::types::Payload;
use crate::{Error, Result};
use async_trait::async_trait;

/// Source of truth for image bytes
///
/// Implementations return whatever the remote answered. Status codes are
/// carried in the [`Payload`] and are not turned into errors; only
/// transport failures and unreadable bodies are.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch the resource at `url`
    async fn fetch(&self, url: &str) -> Result<Payload>;
}

/// [`ImageFetcher`] over HTTP(S) using reqwest
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher from HTTP settings
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an already configured client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Payload> {
        tracing::debug!(url, "fetching image");

        let response = self.client.get(url).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                "request timed out".to_string()
            } else if e.is_connect() {
                format!("connection failed: {}", e)
            } else {
                e.to_string()
            };
            Error::Fetch {
                url: url.to_string(),
                reason,
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: format!("failed to read response body: {}", e),
        })?;

        Ok(Payload {
            body: body.to_vec(),
            content_type,
            status,
        })
    }
}
