//! Infrastructure layer with filesystem, network and URL adapters.

/// Public URL strategies (direct and rotating CDN).
pub mod cdn;
/// Application configuration.
pub mod config;
/// Remote source fetching.
pub mod fetch;
/// Cache key derivation.
pub mod keys;
/// Lossless artifact optimization.
pub mod optimizer;
/// Transformation pipeline.
pub mod pipeline;
/// Source resolution.
pub mod resolver;
/// Derivative artifact storage.
pub mod store;
/// Built-in transformations.
pub mod transforms;

pub use cdn::{DirectUrlStrategy, RotatingCdnStrategy};
pub use config::{ConfigError, ImageCacheConfig, LogLevel};
pub use fetch::HttpSourceFetcher;
pub use keys::CacheKeyBuilder;
pub use optimizer::{NoopOptimizer, PngOptimizer};
pub use pipeline::TransformationPipeline;
pub use resolver::SourceResolver;
pub use store::{DEFAULT_CACHE_PATH, DerivativeStore, StoreStats};
pub use transforms::default_transformations;
