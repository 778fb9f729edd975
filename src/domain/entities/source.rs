//! Source image descriptors.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Where a source image lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A file on the local filesystem.
    Local,
    /// A remote URL, fetched lazily during materialization.
    Remote,
}

/// A resolved source image. Built once at request entry and never
/// re-inspected downstream.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    identifier: String,
    kind: SourceKind,
    absolute_path: Option<PathBuf>,
    last_modified: Option<SystemTime>,
}

impl SourceDescriptor {
    /// Creates a descriptor for a local file.
    #[must_use]
    pub fn local(
        identifier: impl Into<String>,
        absolute_path: PathBuf,
        last_modified: Option<SystemTime>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            kind: SourceKind::Local,
            absolute_path: Some(absolute_path),
            last_modified,
        }
    }

    /// Creates a descriptor for a remote URL. The modification time is
    /// unknown until the bytes are fetched.
    #[must_use]
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            identifier: url.into(),
            kind: SourceKind::Remote,
            absolute_path: None,
            last_modified: None,
        }
    }

    /// Returns the user-supplied identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Returns the source kind.
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Returns true for remote sources.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.kind == SourceKind::Remote
    }

    /// Returns the absolute path of a local source.
    #[must_use]
    pub fn absolute_path(&self) -> Option<&Path> {
        self.absolute_path.as_deref()
    }

    /// Returns the source's modification time, if known.
    #[must_use]
    pub const fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// Returns the string that identifies this source in a cache key:
    /// the absolute local path, or the literal remote URL.
    #[must_use]
    pub fn identity(&self) -> String {
        self.absolute_path
            .as_ref()
            .map_or_else(|| self.identifier.clone(), |p| p.display().to_string())
    }

    /// Returns the base filename of the source: the substring after the
    /// last path separator, or the whole identity if there is none.
    #[must_use]
    pub fn base_filename(&self) -> String {
        let identity = self.identity();
        match identity.rfind('/') {
            Some(idx) => identity[idx + 1..].to_string(),
            None => identity,
        }
    }
}
