//! Port definition for public URL resolution.

/// Policy for turning a public-root-relative path into an absolute URL.
///
/// Implementations must be safe under concurrent calls; URL resolution has
/// no failure mode (pure string manipulation).
pub trait UrlStrategy: Send + Sync {
    /// Returns the full public URL for `relative_path`, which is already
    /// relative to the public root and starts with `/`.
    fn get_url(&self, relative_path: &str) -> String;
}
