//! Port definition for cache tiers.

use bytes::Bytes;

use crate::domain::entities::{CacheKey, DisplayImage, ImageSource};

/// What a successful network fetch leaves behind for the tiers to keep.
///
/// In-process tiers keep the decoded image, durable tiers keep the bytes.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Payload bytes as fetched (post-resize when a resize applied).
    pub bytes: Bytes,
    /// The decoded payload.
    pub image: DisplayImage,
}

/// One layer of the cache chain.
/// Implementations must be thread-safe and tolerate concurrent access to
/// different keys.
#[async_trait::async_trait]
pub trait CacheTier: Send + Sync {
    /// Source reported for images this tier serves.
    fn source(&self) -> ImageSource;

    /// Looks up an image. Any failure (missing key, corrupt entry, I/O
    /// error) is reported as a miss.
    async fn try_get(&self, key: &CacheKey) -> Option<DisplayImage>;

    /// Stores an entry, overwriting whatever the key held. Best-effort:
    /// failures are logged by the tier, never returned.
    async fn put(&self, key: &CacheKey, entry: &CacheEntry);
}
