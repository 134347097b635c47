//! Application layer coordinating image requests across the domain ports.

/// Lifecycle, resolution and fetch services.
pub mod services;

pub use services::{CancellationToken, RequestLifecycleManager, SourceResolver};
