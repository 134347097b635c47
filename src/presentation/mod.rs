//! Presentation layer: display-side bindings for the lifecycle manager.

pub mod target_table;

pub use target_table::{DisplayEvent, TargetStateTable};
