//! In-memory side table of per-target display state.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::domain::entities::{DisplayImage, TargetId, TargetState};
use crate::domain::ports::DisplayBinding;

/// A write observed by the table, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// `set_image` with the image size, or `None` for a clear.
    Image(Option<(u32, u32)>),
    /// `set_loading`.
    Loading(bool),
}

#[derive(Debug, Default)]
struct Slot {
    state: TargetState,
    history: Vec<DisplayEvent>,
}

/// Display binding keeping each target's state in a map keyed by identity.
///
/// Suited to headless hosts and to hosts that pull state at render time.
#[derive(Debug, Default)]
pub struct TargetStateTable {
    slots: RwLock<HashMap<TargetId, Slot>>,
}

impl TargetStateTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state of `target` (default if never written).
    #[must_use]
    pub fn state(&self, target: TargetId) -> TargetState {
        self.slots
            .read()
            .get(&target)
            .map(|slot| slot.state.clone())
            .unwrap_or_default()
    }

    /// Returns every write made to `target`.
    #[must_use]
    pub fn history(&self, target: TargetId) -> Vec<DisplayEvent> {
        self.slots
            .read()
            .get(&target)
            .map(|slot| slot.history.clone())
            .unwrap_or_default()
    }

    /// Counts `set_image` calls made for `target`.
    #[must_use]
    pub fn image_writes(&self, target: TargetId) -> usize {
        self.history(target)
            .iter()
            .filter(|event| matches!(event, DisplayEvent::Image(_)))
            .count()
    }

    /// Returns the identities of every target written so far.
    #[must_use]
    pub fn targets(&self) -> Vec<TargetId> {
        self.slots.read().keys().copied().collect()
    }

    /// Forgets `target` entirely.
    pub fn remove(&self, target: TargetId) {
        self.slots.write().remove(&target);
    }
}

impl DisplayBinding for TargetStateTable {
    fn set_image(&self, target: TargetId, image: Option<DisplayImage>) {
        let mut slots = self.slots.write();
        let slot = slots.entry(target).or_default();
        slot.history.push(DisplayEvent::Image(
            image.as_ref().map(|img| (img.width(), img.height())),
        ));
        slot.state.current_image = image;
    }

    fn set_loading(&self, target: TargetId, loading: bool) {
        let mut slots = self.slots.write();
        let slot = slots.entry(target).or_default();
        slot.history.push(DisplayEvent::Loading(loading));
        slot.state.is_loading = loading;
    }
}
