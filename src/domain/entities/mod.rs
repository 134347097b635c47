//! Domain entity definitions.

mod image;
mod reference;
mod target;

pub use image::{CacheKey, Dimensions, DisplayImage, ImageSource, LoadedImage, digest_reference};
pub use reference::{ImageReference, ReferenceKind};
pub use target::{LoadRequest, TargetId, TargetState};
