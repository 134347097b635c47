//! Network fetch, optional resize and cache persistence.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::domain::entities::{CacheKey, Dimensions, ImageSource, LoadedImage};
use crate::domain::errors::{LoadError, LoadResult};
use crate::domain::ports::{CacheEntry, CacheTier, ImageDecoder, NetworkTransport};

/// Fetches a reference from the network and persists it into the tiers it
/// was built with.
///
/// An empty tier list fetches without persisting.
pub struct FetchPipeline {
    transport: Arc<dyn NetworkTransport>,
    decoder: Arc<dyn ImageDecoder>,
    tiers: Vec<Arc<dyn CacheTier>>,
}

impl FetchPipeline {
    /// Creates a pipeline persisting into `tiers`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn NetworkTransport>,
        decoder: Arc<dyn ImageDecoder>,
        tiers: Vec<Arc<dyn CacheTier>>,
    ) -> Self {
        Self {
            transport,
            decoder,
            tiers,
        }
    }

    /// Downloads, resizes when both dimensions are given, persists, and
    /// returns the decoded image.
    ///
    /// Nothing is written to any tier unless the payload decodes.
    ///
    /// # Errors
    /// Returns the transport error, or a decode error for unusable payloads.
    pub async fn fetch(&self, reference: &str, dimensions: Dimensions) -> LoadResult<LoadedImage> {
        let bytes = self.transport.get_bytes(reference).await?;

        let payload = match dimensions.resize_target() {
            Some((width, height)) => {
                debug!(reference, width, height, "Resizing fetched image");
                tokio::task::spawn_blocking(move || resize_payload(&bytes, width, height))
                    .await
                    .map_err(|e| LoadError::decode(format!("Resize task panicked: {e}")))??
            }
            None => bytes,
        };

        let image = self.decoder.decode(payload.clone()).await?;

        let key = CacheKey::new(reference, dimensions);
        let entry = CacheEntry {
            bytes: payload,
            image: image.clone(),
        };
        for tier in &self.tiers {
            tier.put(&key, &entry).await;
        }

        debug!(reference, source = "network", "Image loaded successfully");
        Ok(LoadedImage::new(image, ImageSource::Network))
    }

    /// Releases the network transport.
    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

impl std::fmt::Debug for FetchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tiers: Vec<_> = self.tiers.iter().map(|t| t.source()).collect();
        f.debug_struct("FetchPipeline")
            .field("tiers", &tiers)
            .finish_non_exhaustive()
    }
}

/// Decodes `bytes`, scales to exactly `width`×`height` and re-encodes as
/// lossless WebP.
///
/// # Errors
/// Returns a decode error if the source can't be decoded or re-encoded.
pub fn resize_payload(bytes: &[u8], width: u32, height: u32) -> LoadResult<Bytes> {
    let source = image::load_from_memory(bytes)?;
    let resized = source.resize_exact(width, height, FilterType::Lanczos3);
    let rgba = DynamicImage::ImageRgba8(resized.to_rgba8());

    let mut buf = Cursor::new(Vec::new());
    rgba.write_to(&mut buf, ImageFormat::WebP)?;
    Ok(Bytes::from(buf.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mocks::MockTransport;
    use crate::infrastructure::image::decoder::{ImageCrateDecoder, encode_png};
    use crate::infrastructure::image::{DiskImageCache, MemoryImageCache};

    struct Fixture {
        transport: Arc<MockTransport>,
        memory: Arc<MemoryImageCache>,
        disk: Arc<DiskImageCache>,
        _dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                transport: Arc::new(MockTransport::new()),
                memory: Arc::new(MemoryImageCache::new()),
                disk: Arc::new(DiskImageCache::new(
                    dir.path().to_path_buf(),
                    Arc::new(ImageCrateDecoder::new()),
                )),
                _dir: dir,
            }
        }

        fn pipeline(&self, tiers: Vec<Arc<dyn CacheTier>>) -> FetchPipeline {
            FetchPipeline::new(
                self.transport.clone(),
                Arc::new(ImageCrateDecoder::new()),
                tiers,
            )
        }

        fn all_tiers(&self) -> Vec<Arc<dyn CacheTier>> {
            vec![self.memory.clone() as Arc<dyn CacheTier>, self.disk.clone()]
        }
    }

    #[test]
    fn test_resize_payload_exact_size() {
        let resized = resize_payload(&encode_png(300, 200), 100, 50).unwrap();
        let img = image::load_from_memory(&resized).unwrap();
        assert_eq!((img.width(), img.height()), (100, 50));
        assert_eq!(
            image::guess_format(&resized).unwrap(),
            ImageFormat::WebP
        );
    }

    #[test]
    fn test_resize_payload_rejects_garbage() {
        assert!(matches!(
            resize_payload(b"garbage", 10, 10),
            Err(LoadError::DecodeFailure { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_resizes_and_persists() {
        let fx = Fixture::new();
        fx.transport.respond("https://x/a.png", encode_png(300, 200));
        let pipeline = fx.pipeline(fx.all_tiers());

        let dims = Dimensions::exact(100, 50);
        let loaded = pipeline.fetch("https://x/a.png", dims).await.unwrap();

        assert_eq!(loaded.source, ImageSource::Network);
        assert_eq!((loaded.image.width(), loaded.image.height()), (100, 50));

        let key = CacheKey::new("https://x/a.png", dims);
        let from_memory = fx.memory.peek(&key).await.unwrap();
        assert_eq!((from_memory.width(), from_memory.height()), (100, 50));

        let persisted = fx.disk.get_bytes(&key).await.unwrap();
        let from_disk = image::load_from_memory(&persisted).unwrap();
        assert_eq!((from_disk.width(), from_disk.height()), (100, 50));
    }

    #[tokio::test]
    async fn test_fetch_without_dimensions_keeps_original_bytes() {
        let fx = Fixture::new();
        let original = encode_png(12, 8);
        fx.transport.respond("https://x/a.png", original.clone());
        let pipeline = fx.pipeline(fx.all_tiers());

        let loaded = pipeline
            .fetch("https://x/a.png", Dimensions::new(Some(64), None))
            .await
            .unwrap();

        assert_eq!((loaded.image.width(), loaded.image.height()), (12, 8));
        let key = CacheKey::new("https://x/a.png", Dimensions::UNSPECIFIED);
        assert_eq!(fx.disk.get_bytes(&key).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_base_policy_persists_nothing() {
        let fx = Fixture::new();
        fx.transport.respond("https://x/a.png", encode_png(4, 4));
        let pipeline = fx.pipeline(Vec::new());

        assert!(pipeline.fetch("https://x/a.png", Dimensions::UNSPECIFIED).await.is_ok());
        assert!(fx.memory.is_empty().await);
        assert!(fx.disk.is_empty().await);
    }

    #[tokio::test]
    async fn test_transport_failure_writes_nothing() {
        let fx = Fixture::new();
        fx.transport
            .fail("https://x/a.png", LoadError::transport("HTTP 500: Internal Server Error"));
        let pipeline = fx.pipeline(fx.all_tiers());

        let err = pipeline
            .fetch("https://x/a.png", Dimensions::UNSPECIFIED)
            .await
            .unwrap_err();

        assert!(err.is_transport_error());
        assert!(fx.memory.is_empty().await);
        assert!(fx.disk.is_empty().await);
    }

    #[tokio::test]
    async fn test_undecodable_payload_writes_nothing() {
        let fx = Fixture::new();
        fx.transport
            .respond("https://x/a.png", Bytes::from_static(b"<html>oops</html>"));
        let pipeline = fx.pipeline(fx.all_tiers());

        let err = pipeline
            .fetch("https://x/a.png", Dimensions::UNSPECIFIED)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::DecodeFailure { .. }));
        assert!(fx.disk.is_empty().await);
    }

    #[tokio::test]
    async fn test_shutdown_reaches_transport() {
        let fx = Fixture::new();
        let pipeline = fx.pipeline(Vec::new());
        pipeline.shutdown().await;
        assert!(fx.transport.is_shut_down());
    }
}
