//! HTTP access to vendor pricing documents.

use async_trait::async_trait;
use domain_instances::{decode_json, DocumentError};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Error type for a single fetch task
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DocumentError,
    },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Missing from index: {0}")]
    MissingIndex(String),

    #[error("Task aborted: {0}")]
    Aborted(String),
}

/// Source of raw document bytes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OfferFetcher: Send + Sync {
    /// GET a document, optionally with a bearer token
    async fn get(&self, url: &str, bearer: Option<String>) -> Result<Vec<u8>, FetchError>;

    /// POST a form body (OAuth token requests)
    async fn post_form(
        &self,
        url: &str,
        form: Vec<(String, String)>,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Fetches and decodes a JSON, JSONP, or gzip document.
pub async fn fetch_document<T: DeserializeOwned>(
    fetcher: &dyn OfferFetcher,
    url: &str,
    bearer: Option<String>,
) -> Result<T, FetchError> {
    let bytes = fetcher.get(url, bearer).await?;
    debug!(url = %url, bytes = bytes.len(), "Fetched document");
    decode_json(&bytes).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(concat!("instances-collector/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn read(url: &str, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl OfferFetcher for HttpFetcher {
    async fn get(&self, url: &str, bearer: Option<String>) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::read(url, response).await
    }

    async fn post_form(
        &self,
        url: &str,
        form: Vec<(String, String)>,
    ) -> Result<Vec<u8>, FetchError> {
        let response = self.client.post(url).form(&form).send().await?;
        Self::read(url, response).await
    }
}
