//! Image decoder port definition.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::DisplayImage;
use crate::domain::errors::LoadResult;

/// Port turning encoded bytes or files into displayable images.
#[async_trait]
pub trait ImageDecoder: Send + Sync {
    /// Decodes an in-memory payload.
    async fn decode(&self, bytes: Bytes) -> LoadResult<DisplayImage>;

    /// Decodes the file at `path`.
    async fn decode_file(&self, path: &Path) -> LoadResult<DisplayImage>;
}
