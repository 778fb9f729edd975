//! Public URL strategies.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use crate::domain::ports::UrlStrategy;

/// Prefixes every path with the system's own base URL. No rewriting.
pub struct DirectUrlStrategy {
    base_url: String,
}

impl DirectUrlStrategy {
    /// Creates a strategy serving from `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl UrlStrategy for DirectUrlStrategy {
    fn get_url(&self, relative_path: &str) -> String {
        format!("{}{relative_path}", self.base_url)
    }
}

/// Distributes paths over a set of CDN base URLs in round-robin order.
///
/// The cursor is a single atomic counter advanced with one
/// `fetch_add`, so two concurrent callers never observe the same index.
/// Fairness under contention is best-effort, not a correctness property.
pub struct RotatingCdnStrategy {
    base_urls: Vec<String>,
    strip_prefix: Option<String>,
    cursor: AtomicUsize,
}

impl RotatingCdnStrategy {
    /// Creates a strategy over `base_urls`, optionally stripping
    /// `strip_prefix` from each path before prefixing.
    ///
    /// # Panics
    /// Panics when `base_urls` is empty.
    #[must_use]
    pub fn new(base_urls: Vec<String>, strip_prefix: Option<String>) -> Self {
        assert!(!base_urls.is_empty(), "at least one CDN base URL required");
        Self {
            base_urls,
            strip_prefix,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl UrlStrategy for RotatingCdnStrategy {
    fn get_url(&self, relative_path: &str) -> String {
        let path = match &self.strip_prefix {
            Some(prefix) => relative_path.strip_prefix(prefix.as_str()).unwrap_or(relative_path),
            None => relative_path,
        };

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.base_urls.len();
        trace!(index, path, "Rotated CDN endpoint");
        format!("{}{path}", self.base_urls[index])
    }
}
