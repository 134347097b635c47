//! Image load error types.

use thiserror::Error;

/// Result type for load operations.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Failure outcomes of a load.
///
/// None of these cross the resolver boundary; they are logged and collapse
/// into "no image" there.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum LoadError {
    #[error("image not found: {reference}")]
    NotFound { reference: String },

    #[error("transport failure: {message}")]
    TransportFailure { message: String },

    #[error("decode failure: {message}")]
    DecodeFailure { message: String },

    #[error("request superseded")]
    Cancelled,

    #[error("io error: {message}")]
    Io { message: String },

    #[error("invalid reference {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },
}

impl LoadError {
    /// Creates not found error.
    #[must_use]
    pub fn not_found(reference: impl Into<String>) -> Self {
        Self::NotFound {
            reference: reference.into(),
        }
    }

    /// Creates transport failure error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
        }
    }

    /// Creates decode failure error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            message: message.into(),
        }
    }

    /// Creates io error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates invalid reference error.
    #[must_use]
    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Returns whether the failure is a plain miss rather than a fault.
    #[must_use]
    pub const fn is_miss(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Cancelled)
    }

    /// Returns whether error is network related.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<image::ImageError> for LoadError {
    fn from(e: image::ImageError) -> Self {
        Self::decode(e.to_string())
    }
}
