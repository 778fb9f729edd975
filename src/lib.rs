//! imgvault - an on-demand image derivative cache.
//!
//! Given a source image (local file or remote URL) and an ordered list of
//! named transformations, imgvault produces a processed variant, stores it
//! once under a content-addressed name in the public directory, and returns
//! a stable public URL for it, regenerating only when the source changes.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the URL generation and cache control facades.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for filesystem, network and URLs.
pub mod infrastructure;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "imgvault";
