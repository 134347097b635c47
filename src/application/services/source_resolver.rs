//! Resolves a reference through local file, embedded asset, cache tiers and
//! finally the network.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::domain::entities::{
    CacheKey, Dimensions, ImageReference, ImageSource, LoadedImage, ReferenceKind,
};
use crate::domain::ports::{AssetStore, CacheTier, ImageDecoder, NetworkTransport};

use super::fetch_pipeline::FetchPipeline;

/// Ordered source chain for a single image reference.
///
/// Cache tiers are consulted in the order given; the same tiers receive
/// network results.
pub struct SourceResolver {
    decoder: Arc<dyn ImageDecoder>,
    assets: Option<Arc<dyn AssetStore>>,
    tiers: Vec<Arc<dyn CacheTier>>,
    pipeline: FetchPipeline,
}

impl SourceResolver {
    /// Creates a resolver with no embedded asset store.
    #[must_use]
    pub fn new(
        transport: Arc<dyn NetworkTransport>,
        decoder: Arc<dyn ImageDecoder>,
        tiers: Vec<Arc<dyn CacheTier>>,
    ) -> Self {
        let pipeline = FetchPipeline::new(transport, decoder.clone(), tiers.clone());
        Self {
            decoder,
            assets: None,
            tiers,
            pipeline,
        }
    }

    /// Attaches an embedded asset store.
    #[must_use]
    pub fn with_assets(mut self, assets: Arc<dyn AssetStore>) -> Self {
        self.assets = Some(assets);
        self
    }

    /// Returns the first image any source produces, or `None`.
    ///
    /// Failures in every step are treated as misses.
    pub async fn resolve(
        &self,
        reference: &ImageReference,
        dimensions: Dimensions,
    ) -> Option<LoadedImage> {
        if let Some(loaded) = self.try_local_file(reference).await {
            return Some(loaded);
        }

        if let Some(loaded) = self.try_asset(reference).await {
            return Some(loaded);
        }

        let key = CacheKey::new(reference.as_str(), dimensions);
        if let Some(loaded) = self.try_tiers(&key).await {
            return Some(loaded);
        }

        match self.pipeline.fetch(reference.as_str(), dimensions).await {
            Ok(loaded) => Some(loaded),
            Err(e) if e.is_miss() => {
                debug!(reference = %reference, error = %e, "Image not available");
                None
            }
            Err(e) => {
                warn!(reference = %reference, error = %e, "Network fetch failed");
                None
            }
        }
    }

    /// Releases the network transport.
    pub async fn shutdown(&self) {
        self.pipeline.shutdown().await;
    }

    async fn try_local_file(&self, reference: &ImageReference) -> Option<LoadedImage> {
        let path = Path::new(reference.as_str());
        let is_file = tokio::fs::metadata(path)
            .await
            .is_ok_and(|meta| meta.is_file());
        if !is_file {
            return None;
        }

        match self.decoder.decode_file(path).await {
            Ok(image) => {
                trace!(reference = %reference, "Loaded image from local file");
                Some(LoadedImage::new(image, ImageSource::LocalFile))
            }
            Err(e) => {
                debug!(reference = %reference, error = %e, "Local file did not decode");
                None
            }
        }
    }

    async fn try_asset(&self, reference: &ImageReference) -> Option<LoadedImage> {
        let result = match reference.kind() {
            ReferenceKind::Network => return None,
            ReferenceKind::Invalid(reason) => {
                warn!(reference = %reference, reason = %reason, "Malformed image reference");
                return None;
            }
            ReferenceKind::FileUri(path) => self
                .decoder
                .decode_file(&path)
                .await
                .map(|image| LoadedImage::new(image, ImageSource::LocalFile)),
            ReferenceKind::Asset => {
                let assets = self.assets.as_ref()?;
                match assets.open(reference.as_str()).await {
                    Ok(bytes) => self
                        .decoder
                        .decode(bytes)
                        .await
                        .map(|image| LoadedImage::new(image, ImageSource::Asset)),
                    Err(e) => Err(e),
                }
            }
        };

        match result {
            Ok(loaded) => {
                trace!(reference = %reference, source = %loaded.source, "Resolved embedded image");
                Some(loaded)
            }
            Err(e) if e.is_miss() => {
                debug!(reference = %reference, error = %e, "Embedded asset not found");
                None
            }
            Err(e) => {
                warn!(reference = %reference, error = %e, "Failed to load embedded asset");
                None
            }
        }
    }

    async fn try_tiers(&self, key: &CacheKey) -> Option<LoadedImage> {
        for tier in &self.tiers {
            if let Some(image) = tier.try_get(key).await {
                trace!(key = %key, tier = %tier.source(), "Cache tier hit");
                return Some(LoadedImage::new(image, tier.source()));
            }
        }
        None
    }
}

impl std::fmt::Debug for SourceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceResolver")
            .field("has_assets", &self.assets.is_some())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::errors::LoadError;
    use crate::domain::ports::mocks::{MockAssetStore, MockTransport};
    use crate::infrastructure::image::decoder::{ImageCrateDecoder, encode_png};
    use crate::infrastructure::image::{DiskImageCache, MemoryImageCache};

    struct Fixture {
        transport: Arc<MockTransport>,
        memory: Arc<MemoryImageCache>,
        disk: Arc<DiskImageCache>,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            Self {
                transport: Arc::new(MockTransport::new()),
                memory: Arc::new(MemoryImageCache::new()),
                disk: Arc::new(DiskImageCache::new(
                    dir.path().join("cache"),
                    Arc::new(ImageCrateDecoder::new()),
                )),
                dir,
            }
        }

        fn resolver(&self) -> SourceResolver {
            SourceResolver::new(
                self.transport.clone(),
                Arc::new(ImageCrateDecoder::new()),
                vec![self.memory.clone() as Arc<dyn CacheTier>, self.disk.clone()],
            )
        }
    }

    fn size(loaded: &LoadedImage) -> (u32, u32) {
        (loaded.image.width(), loaded.image.height())
    }

    #[tokio::test]
    async fn test_local_file_bypasses_caches() {
        let fx = Fixture::new();
        let path = fx.dir.path().join("local.png");
        std::fs::write(&path, encode_png(6, 6)).unwrap();
        let reference = ImageReference::new(path.to_string_lossy());

        let loaded = fx
            .resolver()
            .resolve(&reference, Dimensions::exact(2, 2))
            .await
            .unwrap();

        assert_eq!(loaded.source, ImageSource::LocalFile);
        assert_eq!(size(&loaded), (6, 6));
        assert!(fx.memory.is_empty().await);
        assert!(fx.disk.is_empty().await);
        assert!(fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_asset_resolution() {
        let fx = Fixture::new();
        let mut assets = MockAssetStore::new();
        assets
            .expect_open()
            .withf(|uri: &str| uri == "icons/logo.png")
            .times(1)
            .returning(|_| Ok(encode_png(5, 5)));
        let resolver = fx.resolver().with_assets(Arc::new(assets));

        let loaded = resolver
            .resolve(&ImageReference::new("icons/logo.png"), Dimensions::UNSPECIFIED)
            .await
            .unwrap();

        assert_eq!(loaded.source, ImageSource::Asset);
        assert!(fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_asset_failure_falls_through_to_network() {
        let fx = Fixture::new();
        fx.transport.respond("icons/logo.png", encode_png(3, 3));
        let mut assets = MockAssetStore::new();
        assets
            .expect_open()
            .returning(|uri| Err(LoadError::io(format!("broken bundle for {uri}"))));
        let resolver = fx.resolver().with_assets(Arc::new(assets));

        let loaded = resolver
            .resolve(&ImageReference::new("icons/logo.png"), Dimensions::UNSPECIFIED)
            .await
            .unwrap();

        assert_eq!(loaded.source, ImageSource::Network);
    }

    #[tokio::test]
    async fn test_network_urls_skip_asset_store() {
        let fx = Fixture::new();
        fx.transport.respond("https://x/a.png", encode_png(3, 3));
        let mut assets = MockAssetStore::new();
        assets.expect_open().never();
        let resolver = fx.resolver().with_assets(Arc::new(assets));

        let loaded = resolver
            .resolve(&ImageReference::new("https://x/a.png"), Dimensions::UNSPECIFIED)
            .await;

        assert!(loaded.is_some());
    }

    #[tokio::test]
    async fn test_second_resolve_hits_cache() {
        let fx = Fixture::new();
        fx.transport.respond("https://x/a.png", encode_png(80, 80));
        let resolver = fx.resolver();
        let reference = ImageReference::new("https://x/a.png");
        let dims = Dimensions::exact(64, 64);

        let first = resolver.resolve(&reference, dims).await.unwrap();
        let second = resolver.resolve(&reference, dims).await.unwrap();

        assert_eq!(first.source, ImageSource::Network);
        assert_eq!(second.source, ImageSource::MemoryCache);
        assert_eq!(size(&second), (64, 64));
        assert_eq!(fx.transport.call_count("https://x/a.png"), 1);
    }

    #[tokio::test]
    async fn test_each_size_resolves_to_its_own_image() {
        let fx = Fixture::new();
        fx.transport.respond("https://x/a.png", encode_png(200, 120));
        let resolver = fx.resolver();
        let reference = ImageReference::new("https://x/a.png");

        let thumb = resolver
            .resolve(&reference, Dimensions::exact(64, 64))
            .await
            .unwrap();
        let wide = resolver
            .resolve(&reference, Dimensions::exact(100, 50))
            .await
            .unwrap();
        let original = resolver
            .resolve(&reference, Dimensions::UNSPECIFIED)
            .await
            .unwrap();

        assert_eq!((thumb.source, size(&thumb)), (ImageSource::Network, (64, 64)));
        assert_eq!((wide.source, size(&wide)), (ImageSource::Network, (100, 50)));
        assert_eq!(
            (original.source, size(&original)),
            (ImageSource::Network, (200, 120))
        );
        assert_eq!(fx.transport.call_count("https://x/a.png"), 3);
    }

    #[tokio::test]
    async fn test_resized_disk_entry_only_serves_its_size_after_restart() {
        let fx = Fixture::new();
        fx.transport.respond("https://x/a.png", encode_png(200, 120));
        let reference = ImageReference::new("https://x/a.png");
        fx.resolver()
            .resolve(&reference, Dimensions::exact(64, 64))
            .await
            .unwrap();

        // Fresh memory tier over the same disk directory.
        let restarted = SourceResolver::new(
            fx.transport.clone(),
            Arc::new(ImageCrateDecoder::new()),
            vec![
                Arc::new(MemoryImageCache::new()) as Arc<dyn CacheTier>,
                fx.disk.clone(),
            ],
        );

        let same = restarted
            .resolve(&reference, Dimensions::exact(64, 64))
            .await
            .unwrap();
        let original = restarted
            .resolve(&reference, Dimensions::UNSPECIFIED)
            .await
            .unwrap();

        assert_eq!((same.source, size(&same)), (ImageSource::DiskCache, (64, 64)));
        assert_eq!(
            (original.source, size(&original)),
            (ImageSource::Network, (200, 120))
        );
        assert_eq!(fx.transport.call_count("https://x/a.png"), 2);
    }

    #[tokio::test]
    async fn test_disk_hit_is_not_rewritten() {
        let fx = Fixture::new();
        let key = CacheKey::new("https://x/a.png", Dimensions::UNSPECIFIED);
        fx.disk.put_bytes(&key, encode_png(9, 9)).await.unwrap();

        let loaded = fx
            .resolver()
            .resolve(&ImageReference::new("https://x/a.png"), Dimensions::UNSPECIFIED)
            .await
            .unwrap();

        assert_eq!(loaded.source, ImageSource::DiskCache);
        assert!(fx.memory.is_empty().await);
        assert!(fx.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_yields_none() {
        let fx = Fixture::new();
        fx.transport
            .fail("https://x/a.png", LoadError::transport("HTTP 503: Service Unavailable"));

        let loaded = fx
            .resolver()
            .resolve(&ImageReference::new("https://x/a.png"), Dimensions::UNSPECIFIED)
            .await;

        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_file_uri_opened_directly() {
        let fx = Fixture::new();
        let path = fx.dir.path().join("viafile.png");
        std::fs::write(&path, encode_png(4, 7)).unwrap();
        let uri = url::Url::from_file_path(&path).unwrap();

        let loaded = fx
            .resolver()
            .resolve(&ImageReference::new(uri.as_str()), Dimensions::UNSPECIFIED)
            .await
            .unwrap();

        assert_eq!(loaded.source, ImageSource::LocalFile);
        assert_eq!(size(&loaded), (4, 7));
    }

    #[tokio::test]
    async fn test_missing_everywhere_yields_none() {
        let fx = Fixture::new();
        let loaded = fx
            .resolver()
            .resolve(&ImageReference::new("nothing.png"), Dimensions::UNSPECIFIED)
            .await;

        assert!(loaded.is_none());
        assert_eq!(fx.transport.calls(), vec!["nothing.png".to_string()]);
    }
}
