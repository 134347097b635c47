//! Infrastructure layer with external service adapters.

/// Loader configuration.
pub mod config;
/// Image handling (caching, fetching, decoding, assembly).
pub mod image;

pub use config::{CachePolicy, CliArgs, ConfigStore, LoaderConfig, LogLevel};
pub use image::{
    CacheStats, DirectoryAssetStore, DiskImageCache, HttpTransport, HttpTransportConfig,
    ImageCrateDecoder, ImageLoader, ImageLoaderConfig, MemoryImageCache,
};
