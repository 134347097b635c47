//! Display targets and the load requests issued for them.

use uuid::Uuid;

use super::image::{Dimensions, DisplayImage};
use super::reference::ImageReference;

/// Stable identity of a display target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(Uuid);

impl TargetId {
    /// Allocates a fresh random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds an identity from a caller-owned integer handle.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UI-visible state of a display target.
#[derive(Debug, Clone, Default)]
pub struct TargetState {
    /// Image currently shown, if any.
    pub current_image: Option<DisplayImage>,
    /// True while a request for this target is in progress.
    pub is_loading: bool,
}

impl TargetState {
    /// Returns true if an image is shown.
    #[must_use]
    pub const fn has_image(&self) -> bool {
        self.current_image.is_some()
    }
}

/// A single load issued for a target.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Target the result is destined for.
    pub target: TargetId,
    /// What to load.
    pub reference: ImageReference,
    /// Requested size.
    pub dimensions: Dimensions,
}

impl LoadRequest {
    /// Creates a load request.
    #[must_use]
    pub const fn new(target: TargetId, reference: ImageReference, dimensions: Dimensions) -> Self {
        Self {
            target,
            reference,
            dimensions,
        }
    }
}
