//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with optional LRU eviction
//! - Disk caching for persistence
//! - HTTP transport, decoding and embedded asset lookup
//! - Loader assembly from configuration

pub mod asset_store;
pub mod decoder;
pub mod disk_cache;
pub mod http_transport;
pub mod loader;
pub mod memory_cache;

pub use asset_store::DirectoryAssetStore;
pub use decoder::ImageCrateDecoder;
pub use disk_cache::DiskImageCache;
pub use http_transport::{HttpTransport, HttpTransportConfig};
pub use loader::{ImageLoader, ImageLoaderConfig};
pub use memory_cache::{CacheStats, MemoryImageCache};
