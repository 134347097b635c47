//! Network transport port definition.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::LoadResult;

/// Port for fetching raw bytes over the network.
///
/// One call per fetch; retries, redirects and pooling are the transport's
/// own business.
#[async_trait]
pub trait NetworkTransport: Send + Sync {
    /// Reads the full payload at `url`.
    async fn get_bytes(&self, url: &str) -> LoadResult<Bytes>;

    /// Releases the underlying connection resources. Later fetches fail.
    async fn shutdown(&self) {}
}
