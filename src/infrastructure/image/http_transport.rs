//! Network transport backed by `reqwest`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, info};

use crate::domain::errors::{LoadError, LoadResult};
use crate::domain::ports::NetworkTransport;

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Maximum concurrent downloads.
    pub max_concurrent_downloads: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 4,
            timeout_secs: 30,
        }
    }
}

/// Downloads image payloads over HTTP(S).
///
/// The client is owned until [`NetworkTransport::shutdown`] releases it.
pub struct HttpTransport {
    client: RwLock<Option<reqwest::Client>>,
    semaphore: Arc<Semaphore>,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Creates a transport with the given configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: HttpTransportConfig) -> LoadResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LoadError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client: RwLock::new(Some(client)),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_downloads.max(1))),
            config,
        })
    }

    /// Returns true until the transport has been shut down.
    pub async fn is_open(&self) -> bool {
        self.client.read().await.is_some()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NetworkTransport for HttpTransport {
    async fn get_bytes(&self, url: &str) -> LoadResult<Bytes> {
        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or_else(|| LoadError::transport("transport has been shut down"))?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| LoadError::transport("transport has been shut down"))?;

        debug!(url, "Downloading image from network");

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| LoadError::transport(format!("Request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(LoadError::not_found(url));
        }
        if !status.is_success() {
            return Err(LoadError::transport(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| LoadError::transport(format!("Failed to read body: {e}")))
    }

    async fn shutdown(&self) {
        if self.client.write().await.take().is_some() {
            self.semaphore.close();
            info!("HTTP transport shut down");
        }
    }
}
