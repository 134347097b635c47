//! Embedded asset store port definition.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::LoadResult;

/// Port resolving non-network URIs to application-bundled resources.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Opens the resource named by `uri` and reads it fully.
    async fn open(&self, uri: &str) -> LoadResult<Bytes>;
}
