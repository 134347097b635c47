//! Image loader assembly.
//!
//! Wires the cache tiers selected by the [`CachePolicy`], the HTTP transport,
//! the decoder and the optional asset directory into a
//! [`RequestLifecycleManager`] driving a [`DisplayBinding`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::application::services::{DEFAULT_DEBOUNCE, RequestLifecycleManager, SourceResolver};
use crate::domain::entities::{Dimensions, ImageReference, TargetId};
use crate::domain::errors::LoadResult;
use crate::domain::ports::{CacheTier, DisplayBinding, ImageDecoder, NetworkTransport};
use crate::infrastructure::config::{CachePolicy, LoaderConfig};

use super::asset_store::DirectoryAssetStore;
use super::decoder::ImageCrateDecoder;
use super::disk_cache::{DiskImageCache, default_cache_dir};
use super::http_transport::{HttpTransport, HttpTransportConfig};
use super::memory_cache::{CacheStats, MemoryImageCache};

/// Configuration for the image loader.
#[derive(Debug, Clone)]
pub struct ImageLoaderConfig {
    /// Enabled cache tiers.
    pub policy: CachePolicy,
    /// Directory of the on-disk tier.
    pub cache_dir: PathBuf,
    /// Root for embedded asset references, if any.
    pub asset_root: Option<PathBuf>,
    /// Delay before a request commits to loading.
    pub debounce: Duration,
    /// Bound on the in-memory tier. Unbounded when `None`.
    pub memory_capacity: Option<usize>,
    /// HTTP settings.
    pub transport: HttpTransportConfig,
}

impl Default for ImageLoaderConfig {
    fn default() -> Self {
        Self {
            policy: CachePolicy::default(),
            cache_dir: default_cache_dir(),
            asset_root: None,
            debounce: DEFAULT_DEBOUNCE,
            memory_capacity: None,
            transport: HttpTransportConfig::default(),
        }
    }
}

impl From<&LoaderConfig> for ImageLoaderConfig {
    fn from(config: &LoaderConfig) -> Self {
        Self {
            policy: config.cache_policy,
            cache_dir: config.effective_cache_dir(),
            asset_root: config.asset_root.clone(),
            debounce: config.debounce(),
            memory_capacity: config.memory_capacity,
            transport: HttpTransportConfig {
                max_concurrent_downloads: config.max_concurrent_downloads,
                timeout_secs: config.timeout_secs,
            },
        }
    }
}

/// Fully assembled loader: the lifecycle manager plus handles on its tiers.
pub struct ImageLoader {
    manager: RequestLifecycleManager,
    memory_cache: Option<Arc<MemoryImageCache>>,
    disk_cache: Option<Arc<DiskImageCache>>,
    config: ImageLoaderConfig,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ImageLoader {
    /// Creates a loader fetching over HTTP.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn new(config: ImageLoaderConfig, display: Arc<dyn DisplayBinding>) -> LoadResult<Self> {
        let transport = Arc::new(HttpTransport::new(config.transport.clone())?);
        Ok(Self::with_transport(config, display, transport))
    }

    /// Creates a loader using the given transport.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn with_transport(
        config: ImageLoaderConfig,
        display: Arc<dyn DisplayBinding>,
        transport: Arc<dyn NetworkTransport>,
    ) -> Self {
        let decoder: Arc<dyn ImageDecoder> = Arc::new(ImageCrateDecoder::new());

        let memory_cache = config.policy.uses_memory().then(|| {
            Arc::new(
                config
                    .memory_capacity
                    .map_or_else(MemoryImageCache::new, MemoryImageCache::with_capacity),
            )
        });
        let disk_cache = config
            .policy
            .uses_disk()
            .then(|| Arc::new(DiskImageCache::new(config.cache_dir.clone(), decoder.clone())));

        let mut tiers: Vec<Arc<dyn CacheTier>> = Vec::new();
        if let Some(memory) = &memory_cache {
            tiers.push(memory.clone());
        }
        if let Some(disk) = &disk_cache {
            tiers.push(disk.clone());
        }

        let mut resolver = SourceResolver::new(transport, decoder, tiers);
        if let Some(root) = &config.asset_root {
            resolver = resolver.with_assets(Arc::new(DirectoryAssetStore::new(root.clone())));
        }

        info!(
            policy = %config.policy,
            cache_dir = %config.cache_dir.display(),
            debounce_ms = config.debounce.as_millis(),
            "Image loader ready"
        );

        let manager = RequestLifecycleManager::new(Arc::new(resolver), display, config.debounce);

        Self {
            manager,
            memory_cache,
            disk_cache,
            config,
        }
    }

    /// Returns the lifecycle manager.
    #[must_use]
    pub const fn manager(&self) -> &RequestLifecycleManager {
        &self.manager
    }

    /// Assigns `reference` to `target`. See
    /// [`RequestLifecycleManager::on_reference_changed`].
    pub fn load(&self, target: TargetId, reference: Option<ImageReference>, dimensions: Dimensions) {
        self.manager
            .on_reference_changed(target, reference, dimensions);
    }

    /// Returns the in-memory tier, when enabled.
    #[must_use]
    pub fn memory_cache(&self) -> Option<&Arc<MemoryImageCache>> {
        self.memory_cache.as_ref()
    }

    /// Returns the on-disk tier, when enabled.
    #[must_use]
    pub fn disk_cache(&self) -> Option<&Arc<DiskImageCache>> {
        self.disk_cache.as_ref()
    }

    /// Returns in-memory tier statistics, when enabled.
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.memory_cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Wipes the on-disk tier. A no-op when it is disabled.
    ///
    /// # Errors
    /// Returns error if an entry cannot be removed.
    pub async fn clear_disk_cache(&self) -> LoadResult<()> {
        if let Some(disk) = &self.disk_cache {
            disk.clear().await?;
        }
        Ok(())
    }

    /// Waits for every in-flight request to settle.
    pub async fn wait_idle(&self) {
        self.manager.wait_idle().await;
    }

    /// Cancels outstanding work and releases the transport.
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
        if let Some(stats) = self.cache_stats().await {
            debug!(%stats, "Image loader stopped");
        }
    }
}
