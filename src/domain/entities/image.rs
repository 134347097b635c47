//! Domain types for loaded images and their cache identities.

use std::sync::Arc;

use sha2::{Digest, Sha256};

/// Decoded image handed to display targets.
pub type DisplayImage = Arc<image::DynamicImage>;

/// Requested target dimensions.
///
/// `None` on either axis is the "unspecified" sentinel. A resize only happens
/// when both axes are specified and non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimensions {
    /// Requested width in pixels.
    pub width: Option<u32>,
    /// Requested height in pixels.
    pub height: Option<u32>,
}

impl Dimensions {
    /// Dimensions with neither axis specified.
    pub const UNSPECIFIED: Self = Self {
        width: None,
        height: None,
    };

    /// Creates dimensions from optional width and height.
    #[must_use]
    pub const fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    /// Creates fully specified dimensions.
    #[must_use]
    pub const fn exact(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
        }
    }

    /// Returns the exact target size when both axes are usable for a resize.
    #[must_use]
    pub fn resize_target(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.resize_target() {
            Some((w, h)) => write!(f, "{w}x{h}"),
            None => write!(f, "original"),
        }
    }
}

/// Identity of a cached image.
///
/// The memory tier keys on the reference itself (plus the exact size, when a
/// resize applies). The disk tier keys on a SHA-256 digest of the reference
/// so file names stay filesystem-safe; every size of a reference shares that
/// one file, so disk reads check the stored entry against [`CacheKey::size`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    reference: String,
    size: Option<(u32, u32)>,
}

impl CacheKey {
    /// Builds the key for a reference requested at the given dimensions.
    #[must_use]
    pub fn new(reference: impl Into<String>, dimensions: Dimensions) -> Self {
        Self {
            reference: reference.into(),
            size: dimensions.resize_target(),
        }
    }

    /// Returns the reference this key was built from.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Exact size requested, when a resize applies.
    #[must_use]
    pub const fn size(&self) -> Option<(u32, u32)> {
        self.size
    }

    /// Key used by in-process tiers.
    #[must_use]
    pub fn memory_key(&self) -> String {
        match self.size {
            Some((w, h)) => format!("{}@{w}x{h}", self.reference),
            None => self.reference.clone(),
        }
    }

    /// Fixed-width hex digest of the reference, used as the disk file name.
    #[must_use]
    pub fn digest(&self) -> String {
        digest_reference(&self.reference)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.memory_key())
    }
}

/// Hashes a reference string into a 64-character lowercase hex digest.
#[must_use]
pub fn digest_reference(reference: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(reference.as_bytes());
    hex::encode(hasher.finalize())
}

/// Where an image was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// Decoded straight from a local file.
    LocalFile,
    /// Decoded from an embedded application asset.
    Asset,
    /// Served by the in-process memory tier.
    MemoryCache,
    /// Served by the on-disk tier.
    DiskCache,
    /// Downloaded from the network.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalFile => write!(f, "file"),
            Self::Asset => write!(f, "asset"),
            Self::MemoryCache => write!(f, "memory"),
            Self::DiskCache => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// An image produced by the resolver, tagged with its origin.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// The decoded image.
    pub image: DisplayImage,
    /// Where it came from.
    pub source: ImageSource,
}

impl LoadedImage {
    /// Wraps a decoded image.
    #[must_use]
    pub const fn new(image: DisplayImage, source: ImageSource) -> Self {
        Self { image, source }
    }
}
