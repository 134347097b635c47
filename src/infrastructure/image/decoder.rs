//! Decoder backed by the `image` crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::DisplayImage;
use crate::domain::errors::{LoadError, LoadResult};
use crate::domain::ports::ImageDecoder;

/// Decodes PNG, JPEG and WebP payloads off the async executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageCrateDecoder {
    /// Creates a decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ImageDecoder for ImageCrateDecoder {
    async fn decode(&self, bytes: Bytes) -> LoadResult<DisplayImage> {
        let decoded = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| LoadError::decode(format!("Decode task panicked: {e}")))?
            .map_err(|e| LoadError::decode(format!("Failed to decode image: {e}")))?;
        Ok(Arc::new(decoded))
    }

    async fn decode_file(&self, path: &Path) -> LoadResult<DisplayImage> {
        let path: PathBuf = path.to_path_buf();
        let decoded = tokio::task::spawn_blocking(move || -> LoadResult<image::DynamicImage> {
            image::ImageReader::open(&path)?
                .with_guessed_format()?
                .decode()
                .map_err(LoadError::from)
        })
        .await
        .map_err(|e| LoadError::decode(format!("Decode task panicked: {e}")))??;
        Ok(Arc::new(decoded))
    }
}

/// Encodes a solid test image of the given size as PNG.
#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32) -> Bytes {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("png encoding of an in-memory image");
    Bytes::from(buf.into_inner())
}
