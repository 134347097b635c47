//! image-loader - on-demand image loading for display targets.
//!
//! This crate resolves image references through local files, embedded assets,
//! memory and disk cache tiers and finally the network, and applies results
//! to display targets so that only the most recent request for a target can
//! ever be shown.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the request lifecycle and source resolution.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;
/// Presentation layer containing display bindings.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "image-loader";
