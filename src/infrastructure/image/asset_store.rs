//! Embedded asset store backed by an application resource directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use relative_path::RelativePath;
use tokio::fs;
use tracing::trace;
use url::Url;

use crate::domain::errors::{LoadError, LoadResult};
use crate::domain::ports::AssetStore;

/// Resolves asset URIs against a root directory shipped with the application.
///
/// Relative URIs (`icons/logo.png`) map directly below the root. Absolute
/// application URIs map their host and path below it, so both
/// `asset:///icons/logo.png` and `app://icons/logo.png` name
/// `<root>/icons/logo.png`. Keys that would climb out of the root are
/// rejected.
#[derive(Debug, Clone)]
pub struct DirectoryAssetStore {
    root: PathBuf,
}

impl DirectoryAssetStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the asset root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps an asset URI to a path under the root.
    ///
    /// # Errors
    /// Returns `InvalidReference` for keys outside the root.
    pub fn resolve_path(&self, uri: &str) -> LoadResult<PathBuf> {
        let key = asset_key(uri);
        let absolute = RelativePath::new(key.trim_start_matches('/')).to_logical_path(&self.root);
        if !absolute.starts_with(&self.root) || absolute == self.root {
            return Err(LoadError::invalid_reference(
                uri,
                "path is outside the asset root directory",
            ));
        }
        Ok(absolute)
    }
}

#[async_trait]
impl AssetStore for DirectoryAssetStore {
    async fn open(&self, uri: &str) -> LoadResult<Bytes> {
        let path = self.resolve_path(uri)?;
        trace!(uri, path = %path.display(), "Opening embedded asset");
        match fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(LoadError::not_found(uri)),
            Err(e) => Err(LoadError::io(format!("Failed to read asset {uri}: {e}"))),
        }
    }
}

fn asset_key(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default();
            format!("{host}{}", url.path())
        }
        Err(_) => uri
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
