mod asset_port;
mod cache_tier_port;
mod decoder_port;
mod display_port;
mod transport_port;

pub use asset_port::AssetStore;
pub use cache_tier_port::{CacheEntry, CacheTier};
pub use decoder_port::ImageDecoder;
pub use display_port::DisplayBinding;
pub use transport_port::NetworkTransport;
