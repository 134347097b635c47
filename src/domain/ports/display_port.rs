//! Display target binding port definition.

use crate::domain::entities::{DisplayImage, TargetId};

/// The UI-side setters a lifecycle manager drives.
///
/// Calls arrive in the order the manager decided them, never while it holds
/// its registry lock. An implementation may call back into the manager; the
/// writes that call produces are applied after the current one returns.
pub trait DisplayBinding: Send + Sync {
    /// Replaces the image shown by `target`.
    fn set_image(&self, target: TargetId, image: Option<DisplayImage>);

    /// Updates the loading indicator of `target`.
    fn set_loading(&self, target: TargetId, loading: bool);
}
