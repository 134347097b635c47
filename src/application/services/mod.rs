//! Application services: request lifecycle, source resolution and fetching.

pub mod cancellation;
pub mod fetch_pipeline;
pub mod request_lifecycle;
pub mod source_resolver;

pub use cancellation::CancellationToken;
pub use fetch_pipeline::{FetchPipeline, resize_payload};
pub use request_lifecycle::{DEFAULT_DEBOUNCE, RequestLifecycleManager};
pub use source_resolver::SourceResolver;
