//! Disk-based image cache for persistence across sessions.
//!
//! Layout is a single flat directory. Each entry is a file named by the
//! SHA-256 hex digest of its reference, without extension, holding the raw
//! payload bytes. There is no manifest.
//!
//! All requested sizes of a reference share one file, so a read only counts
//! as a hit when the stored payload matches the key: an exact-size key needs
//! an image of exactly that size, and an unsized key refuses the lossless
//! WebP payloads that resizing produces.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::domain::entities::{CacheKey, DisplayImage, ImageSource};
use crate::domain::errors::{LoadError, LoadResult};
use crate::domain::ports::{CacheEntry, CacheTier, ImageDecoder};

const DIGEST_LEN: usize = 64;

/// Durable tier persisting raw image bytes.
pub struct DiskImageCache {
    cache_dir: PathBuf,
    decoder: Arc<dyn ImageDecoder>,
}

impl DiskImageCache {
    /// Creates a disk cache rooted at `cache_dir`.
    ///
    /// The directory is created lazily on the first write.
    #[must_use]
    pub fn new(cache_dir: PathBuf, decoder: Arc<dyn ImageDecoder>) -> Self {
        Self { cache_dir, decoder }
    }

    /// Creates a cache in the default location (`<cache dir>/image-loader/images`).
    #[must_use]
    pub fn default_location(decoder: Arc<dyn ImageDecoder>) -> Self {
        Self::new(default_cache_dir(), decoder)
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path for a cached entry.
    fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.digest())
    }

    /// Gets raw bytes from the disk cache.
    pub async fn get_bytes(&self, key: &CacheKey) -> Option<Bytes> {
        let path = self.cache_path(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(key = %key, path = %path.display(), "Disk cache hit");
                Some(Bytes::from(bytes))
            }
            Err(e) => {
                trace!(key = %key, error = %e, "Disk cache miss");
                None
            }
        }
    }

    /// Stores raw bytes, replacing any existing entry for the key.
    ///
    /// The payload is written to a temporary file in the cache directory and
    /// renamed into place, so readers never observe a partial entry.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or the file cannot be
    /// written.
    pub async fn put_bytes(&self, key: &CacheKey, bytes: Bytes) -> LoadResult<()> {
        let dir = self.cache_dir.clone();
        let path = self.cache_path(key);
        let size = bytes.len();

        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            let mut temp_file = tempfile::NamedTempFile::new_in(&dir)?;
            temp_file.write_all(&bytes)?;
            temp_file.flush()?;
            temp_file.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| LoadError::io(format!("Cache write task panicked: {e}")))?
        .map_err(|e| LoadError::io(format!("Failed to write cache file: {e}")))?;

        debug!(key = %key, path = %path.display(), size, "Stored image in disk cache");
        Ok(())
    }

    /// Checks if an entry exists for the key.
    pub async fn contains(&self, key: &CacheKey) -> bool {
        fs::try_exists(self.cache_path(key)).await.unwrap_or(false)
    }

    /// Counts cached entries.
    pub async fn len(&self) -> usize {
        self.entry_paths().await.len()
    }

    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes every cached entry. A missing directory counts as empty.
    ///
    /// # Errors
    /// Returns error if an entry cannot be removed.
    pub async fn clear(&self) -> LoadResult<()> {
        let mut removed = 0usize;
        for path in self.entry_paths().await {
            fs::remove_file(&path)
                .await
                .map_err(|e| LoadError::io(format!("Failed to remove cache file: {e}")))?;
            removed += 1;
        }
        debug!(removed, "Cleared disk cache");
        Ok(())
    }

    async fn entry_paths(&self) -> Vec<PathBuf> {
        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return Vec::new();
        };

        let mut paths = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_entry_name)
            {
                paths.push(path);
            }
        }
        paths
    }
}

impl std::fmt::Debug for DiskImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskImageCache")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl CacheTier for DiskImageCache {
    fn source(&self) -> ImageSource {
        ImageSource::DiskCache
    }

    async fn try_get(&self, key: &CacheKey) -> Option<DisplayImage> {
        let bytes = self.get_bytes(key).await?;
        if key.size().is_none() && is_lossless_webp(&bytes) {
            debug!(key = %key, "Disk entry holds a resized variant");
            return None;
        }
        match self.decoder.decode(bytes).await {
            Ok(img) => match key.size() {
                Some((width, height)) if (img.width(), img.height()) != (width, height) => {
                    debug!(
                        key = %key,
                        stored_width = img.width(),
                        stored_height = img.height(),
                        "Disk entry has a different size"
                    );
                    None
                }
                _ => {
                    debug!(key = %key, "Decoded image from disk cache");
                    Some(img)
                }
            },
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to decode cached image");
                None
            }
        }
    }

    async fn put(&self, key: &CacheKey, entry: &CacheEntry) {
        if let Err(e) = self.put_bytes(key, entry.bytes.clone()).await {
            warn!(key = %key, error = %e, "Failed to cache to disk");
        }
    }
}

/// Returns true for a RIFF/WebP container holding a `VP8L` (lossless) chunk.
fn is_lossless_webp(bytes: &[u8]) -> bool {
    if bytes.get(0..4) != Some(b"RIFF".as_slice()) || bytes.get(8..12) != Some(b"WEBP".as_slice()) {
        return false;
    }
    let mut offset = 12usize;
    while let Some(header) = offset.checked_add(8).and_then(|end| bytes.get(offset..end)) {
        if &header[0..4] == b"VP8L" {
            return true;
        }
        let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        offset = offset
            .saturating_add(8)
            .saturating_add(len)
            .saturating_add(len % 2);
    }
    false
}

fn is_entry_name(name: &str) -> bool {
    name.len() == DIGEST_LEN && name.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Returns the default cache directory path.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "linuxmobile", "image-loader").map_or_else(
        || {
            std::env::temp_dir()
                .join("image-loader")
                .join("cache")
                .join("images")
        },
        |dirs| dirs.cache_dir().join("images"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::resize_payload;
    use crate::domain::entities::{Dimensions, digest_reference};
    use crate::infrastructure::image::decoder::{ImageCrateDecoder, encode_png};
    use tempfile::TempDir;

    fn create_test_cache() -> (DiskImageCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = DiskImageCache::new(
            temp_dir.path().join("images"),
            Arc::new(ImageCrateDecoder::new()),
        );
        (cache, temp_dir)
    }

    fn key(reference: &str) -> CacheKey {
        CacheKey::new(reference, Dimensions::UNSPECIFIED)
    }

    #[tokio::test]
    async fn test_directory_created_lazily() {
        let (cache, _temp) = create_test_cache();
        assert!(!cache.cache_dir().exists());
        assert!(cache.get_bytes(&key("a")).await.is_none());
        assert!(!cache.cache_dir().exists());

        cache
            .put_bytes(&key("a"), Bytes::from_static(b"data"))
            .await
            .unwrap();
        assert!(cache.cache_dir().exists());
    }

    #[tokio::test]
    async fn test_put_and_get_bytes() {
        let (cache, _temp) = create_test_cache();
        let key = key("https://x/a.png");
        let data = Bytes::from_static(b"test image data");

        cache.put_bytes(&key, data.clone()).await.unwrap();
        let retrieved = cache.get_bytes(&key).await;

        assert_eq!(retrieved, Some(data));
    }

    #[tokio::test]
    async fn test_file_named_by_digest() {
        let (cache, _temp) = create_test_cache();
        let key = key("https://x/a.png");

        cache
            .put_bytes(&key, Bytes::from_static(b"x"))
            .await
            .unwrap();

        let expected = cache.cache_dir().join(digest_reference("https://x/a.png"));
        assert!(expected.is_file());
        assert!(expected.extension().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_entry() {
        let (cache, _temp) = create_test_cache();
        let key = key("a.png");

        cache.put_bytes(&key, Bytes::from_static(b"first")).await.unwrap();
        cache.put_bytes(&key, Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get_bytes(&key).await.unwrap(), Bytes::from_static(b"second"));
    }

    #[tokio::test]
    async fn test_try_get_decodes() {
        let (cache, _temp) = create_test_cache();
        let key = key("https://x/a.png");

        cache.put_bytes(&key, encode_png(7, 3)).await.unwrap();
        let img = cache.try_get(&key).await.unwrap();

        assert_eq!((img.width(), img.height()), (7, 3));
    }

    #[tokio::test]
    async fn test_entry_of_another_size_is_a_miss() {
        let (cache, _temp) = create_test_cache();
        let thumb = CacheKey::new("https://x/a.png", Dimensions::exact(64, 64));
        let wide = CacheKey::new("https://x/a.png", Dimensions::exact(100, 50));

        cache
            .put_bytes(&thumb, resize_payload(&encode_png(200, 120), 64, 64).unwrap())
            .await
            .unwrap();

        let img = cache.try_get(&thumb).await.unwrap();
        assert_eq!((img.width(), img.height()), (64, 64));
        assert!(cache.try_get(&wide).await.is_none());
    }

    #[tokio::test]
    async fn test_resized_entry_is_a_miss_without_size() {
        let (cache, _temp) = create_test_cache();
        let thumb = CacheKey::new("https://x/a.png", Dimensions::exact(64, 64));

        cache
            .put_bytes(&thumb, resize_payload(&encode_png(200, 120), 64, 64).unwrap())
            .await
            .unwrap();

        assert!(cache.try_get(&key("https://x/a.png")).await.is_none());
    }

    #[tokio::test]
    async fn test_original_entry_serves_matching_size() {
        let (cache, _temp) = create_test_cache();
        cache
            .put_bytes(&key("https://x/a.png"), encode_png(64, 64))
            .await
            .unwrap();

        let sized = CacheKey::new("https://x/a.png", Dimensions::exact(64, 64));
        assert!(cache.try_get(&sized).await.is_some());
        assert!(cache.try_get(&key("https://x/a.png")).await.is_some());
    }

    #[test]
    fn test_lossless_webp_detection() {
        let resized = resize_payload(&encode_png(8, 8), 4, 4).unwrap();
        assert!(is_lossless_webp(&resized));
        assert!(!is_lossless_webp(&encode_png(4, 4)));
        assert!(!is_lossless_webp(b"RIFF\x04\x00\x00\x00WEBP"));
        assert!(!is_lossless_webp(b"RIFF\xff\xff\xff\xffWEBPVP8 \xff\xff\xff\xff"));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let (cache, _temp) = create_test_cache();
        let key = key("https://x/a.png");

        cache
            .put_bytes(&key, Bytes::from_static(b"not an image"))
            .await
            .unwrap();

        assert!(cache.try_get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_clear_only_removes_entries() {
        let (cache, _temp) = create_test_cache();

        cache.put_bytes(&key("a"), Bytes::from_static(b"1")).await.unwrap();
        cache.put_bytes(&key("b"), Bytes::from_static(b"2")).await.unwrap();
        std::fs::write(cache.cache_dir().join("notes.txt"), "keep").unwrap();

        assert_eq!(cache.len().await, 2);
        cache.clear().await.unwrap();

        assert!(cache.is_empty().await);
        assert!(!cache.contains(&key("a")).await);
        assert!(cache.cache_dir().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_different_keys() {
        let (cache, _temp) = create_test_cache();
        let cache = Arc::new(cache);

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                let key = key(&format!("img{i}"));
                cache
                    .put_bytes(&key, Bytes::from(format!("payload{i}")))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..16 {
            let bytes = cache.get_bytes(&key(&format!("img{i}"))).await.unwrap();
            assert_eq!(bytes, Bytes::from(format!("payload{i}")));
        }
    }
}
