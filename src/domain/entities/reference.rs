//! Image references and their classification.

use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

/// Opaque string naming an image: a local path, an embedded asset URI or a
/// network URL. Cheap to clone and immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference(Arc<str>);

impl ImageReference {
    /// Creates a reference from any string-like input.
    #[must_use]
    pub fn new(reference: impl AsRef<str>) -> Self {
        Self(Arc::from(reference.as_ref()))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classifies the reference by its URI shape.
    #[must_use]
    pub fn kind(&self) -> ReferenceKind {
        ReferenceKind::classify(&self.0)
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImageReference {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ImageReference {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// How a reference should be looked up once it is known not to name an
/// existing local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Absolute `http` or `https` URL.
    Network,
    /// Absolute `file:` URI, opened directly as a path.
    FileUri(PathBuf),
    /// Relative URI or absolute URI with an application scheme.
    Asset,
    /// Not parseable as a URI at all.
    Invalid(String),
}

impl ReferenceKind {
    /// Classifies a raw reference string.
    #[must_use]
    pub fn classify(reference: &str) -> Self {
        match Url::parse(reference) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Self::Network,
                "file" => url.to_file_path().map_or_else(
                    |()| Self::Invalid(format!("file URI has no local path: {reference}")),
                    Self::FileUri,
                ),
                _ => Self::Asset,
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Self::Asset,
            Err(e) => Self::Invalid(e.to_string()),
        }
    }
}
