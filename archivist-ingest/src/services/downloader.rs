//! Source downloader
//!
//! [`Fetcher`] is the seam between the driver and the transport: the driver
//! only sees `(status, bytes)` or a network error. [`HttpFetcher`] serves
//! `http(s)://` URLs through reqwest and `file://` URLs (or bare paths) from
//! the local filesystem.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("archivist-ingest/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot read {path}: {message}")]
    File { path: String, message: String },
}

/// Downloaded payload with its status (200 for local files)
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    http_client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            timeout_secs,
        })
    }

    async fn fetch_http(&self, url: &str) -> Result<Fetched, FetchError> {
        tracing::debug!(source_url = %url, "Downloading source");

        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout_secs)
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout_secs)
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        tracing::debug!(source_url = %url, status, bytes = body.len(), "Source downloaded");

        Ok(Fetched {
            status,
            body: body.to_vec(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.fetch_http(url).await;
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        let body = tokio::fs::read(path).await.map_err(|e| FetchError::File {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        Ok(Fetched { status: 200, body })
    }
}
