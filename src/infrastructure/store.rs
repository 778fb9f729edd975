//! Derivative artifact storage with atomic commits.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use tokio::fs;
use tracing::{debug, trace, warn};

use crate::domain::entities::{CacheKey, SourceDescriptor, TransformationSpec};
use crate::domain::errors::{ImageError, ImageResult};

/// Default path of the cache inside the public directory.
pub const DEFAULT_CACHE_PATH: &str = "cache/img";

/// Aggregate size information for the cache directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    /// Number of cached artifacts.
    pub artifacts: usize,
    /// Total size in bytes.
    pub total_size: u64,
}

/// Maps cache keys to on-disk artifacts under the public root.
///
/// Artifacts appear at their canonical path atomically: producers write to
/// a uniquely named temp file in the cache directory and rename it into
/// place. A per-key async mutex serializes in-process producers so
/// concurrent requests for the same derivative do the work once; the
/// rename keeps cross-process races safe as well.
pub struct DerivativeStore {
    public_root: PathBuf,
    cache_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DerivativeStore {
    /// Creates a store rooted at `public_root`, caching under
    /// `cache_path` (relative to the public root).
    ///
    /// The cache directory is created lazily on first write, so a
    /// `clear()` racing an in-flight materialization costs at most one
    /// regeneration.
    #[must_use]
    pub fn new(public_root: PathBuf, cache_path: &str) -> Self {
        let cache_dir = public_root.join(cache_path);
        Self {
            public_root,
            cache_dir,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the absolute public root directory.
    #[must_use]
    pub fn public_root(&self) -> &Path {
        &self.public_root
    }

    /// Returns the cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the canonical artifact path for a key.
    #[must_use]
    pub fn artifact_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.as_str())
    }

    /// Returns the source's own path when it can be served directly:
    /// no transformations requested and the file already lives under the
    /// public root. Skipping the copy is an optimization; the returned
    /// path is publicly servable either way.
    #[must_use]
    pub fn passthrough(
        &self,
        source: &SourceDescriptor,
        transformations: &TransformationSpec,
    ) -> Option<PathBuf> {
        if !transformations.is_empty() {
            return None;
        }
        let path = source.absolute_path()?;
        path.starts_with(&self.public_root)
            .then(|| path.to_path_buf())
    }

    /// Makes `path` relative to the public root, with a leading `/`.
    ///
    /// # Errors
    /// Returns an I/O error when the path is not under the public root.
    pub fn relative_path(&self, path: &Path) -> ImageResult<String> {
        let relative = path.strip_prefix(&self.public_root).map_err(|_| {
            ImageError::Io(std::io::Error::other(format!(
                "{} is not under the public root",
                path.display()
            )))
        })?;
        Ok(format!("/{}", relative.display()))
    }

    /// Ensures a fresh artifact exists for `key` and returns its path.
    ///
    /// An existing artifact is fresh iff the source's modification time is
    /// unknown (remote, not fetched this session) or the artifact's
    /// modification time is at least the source's. Otherwise `produce` is
    /// invoked with the source and a temp path; it either writes the new
    /// artifact there and returns `true`, or returns `false` to request a
    /// straight byte copy of the source. The temp file is then renamed
    /// into place, so readers never observe a partial artifact.
    ///
    /// # Errors
    /// Propagates `produce` failures and filesystem errors.
    pub async fn materialize<F, Fut>(
        &self,
        key: &CacheKey,
        source: &SourceDescriptor,
        produce: F,
    ) -> ImageResult<PathBuf>
    where
        F: FnOnce(SourceDescriptor, PathBuf) -> Fut,
        Fut: Future<Output = ImageResult<bool>>,
    {
        let target = self.artifact_path(key);

        if self.is_fresh(&target, source).await {
            trace!(key = %key, "Cache hit");
            return Ok(target);
        }

        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        // A concurrent producer may have finished while we waited.
        if self.is_fresh(&target, source).await {
            trace!(key = %key, "Cache hit after waiting on producer");
            self.release(key, &lock);
            return Ok(target);
        }

        debug!(key = %key, "Materializing derivative");
        let result = self.produce_into(&target, source, produce).await;
        self.release(key, &lock);
        result?;

        Ok(target)
    }

    async fn produce_into<F, Fut>(
        &self,
        target: &Path,
        source: &SourceDescriptor,
        produce: F,
    ) -> ImageResult<()>
    where
        F: FnOnce(SourceDescriptor, PathBuf) -> Fut,
        Fut: Future<Output = ImageResult<bool>>,
    {
        fs::create_dir_all(&self.cache_dir).await?;

        let temp = tempfile::NamedTempFile::new_in(&self.cache_dir)?;
        let temp_path = temp.into_temp_path();

        let wrote = produce(source.clone(), temp_path.to_path_buf()).await?;
        if !wrote {
            let absolute = source.absolute_path().ok_or_else(|| {
                ImageError::Io(std::io::Error::other(
                    "byte-copy fallback requires a local source",
                ))
            })?;
            fs::copy(absolute, &temp_path).await?;
        }

        temp_path.persist(target).map_err(|e| e.error)?;
        debug!(target = %target.display(), "Committed artifact");
        Ok(())
    }

    async fn is_fresh(&self, target: &Path, source: &SourceDescriptor) -> bool {
        let Ok(meta) = fs::metadata(target).await else {
            return false;
        };
        let Some(source_mtime) = source.last_modified() else {
            return true;
        };
        let artifact_mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        artifact_mtime >= source_mtime
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(key.as_str().to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn release(&self, key: &CacheKey, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock();
        // Drop the map entry once no other producer holds a handle.
        if Arc::strong_count(lock) <= 2 {
            locks.remove(key.as_str());
        }
    }

    /// Deletes the entire cache directory. Idempotent; a missing
    /// directory is a no-op. The directory is recreated lazily by the
    /// next materialization.
    ///
    /// # Errors
    /// Returns filesystem errors other than the directory being absent.
    pub async fn clear(&self) -> ImageResult<()> {
        match fs::remove_dir_all(&self.cache_dir).await {
            Ok(()) => {
                debug!(dir = %self.cache_dir.display(), "Cleared derivative cache");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Scans the cache directory and reports artifact count and size.
    ///
    /// # Errors
    /// Returns filesystem errors from reading the directory.
    pub async fn stats(&self) -> ImageResult<StoreStats> {
        let mut stats = StoreStats::default();
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            match entry.metadata().await {
                Ok(meta) if meta.is_file() => {
                    stats.artifacts += 1;
                    stats.total_size += meta.len();
                }
                Ok(_) => {}
                Err(e) => warn!(path = %entry.path().display(), error = %e, "Unreadable cache entry"),
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Transformation;
    use std::time::Duration;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> DerivativeStore {
        DerivativeStore::new(dir.path().to_path_buf(), DEFAULT_CACHE_PATH)
    }

    fn local_source(path: &Path) -> SourceDescriptor {
        let mtime = std::fs::metadata(path).unwrap().modified().ok();
        SourceDescriptor::local(path.display().to_string(), path.to_path_buf(), mtime)
    }

    #[tokio::test]
    async fn materialize_writes_atomically_visible_artifact() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let source_path = dir.path().join("src.png");
        std::fs::write(&source_path, b"source bytes").unwrap();

        let key = CacheKey::new("abc-src.png");
        let path = store
            .materialize(&key, &local_source(&source_path), |_, temp| async move {
                tokio::fs::write(&temp, b"derived").await?;
                Ok(true)
            })
            .await
            .unwrap();

        assert_eq!(path, store.artifact_path(&key));
        assert_eq!(std::fs::read(&path).unwrap(), b"derived");
    }

    #[tokio::test]
    async fn second_call_is_a_cache_hit() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let source_path = dir.path().join("src.png");
        std::fs::write(&source_path, b"source").unwrap();
        let source = local_source(&source_path);
        let key = CacheKey::new("abc-src.png");

        let runs = std::sync::atomic::AtomicUsize::new(0);
        for _ in 0..2 {
            store
                .materialize(&key, &source, |_, temp| {
                    runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    async move {
                        tokio::fs::write(&temp, b"derived").await?;
                        Ok(true)
                    }
                })
                .await
                .unwrap();
        }

        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn source_mtime_advance_forces_regeneration() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let source_path = dir.path().join("src.png");
        std::fs::write(&source_path, b"v1").unwrap();
        let key = CacheKey::new("abc-src.png");

        store
            .materialize(&key, &local_source(&source_path), |_, temp| async move {
                tokio::fs::write(&temp, b"derived v1").await?;
                Ok(true)
            })
            .await
            .unwrap();

        // Push the source's mtime past the artifact's.
        tokio::time::sleep(Duration::from_millis(20)).await;
        std::fs::write(&source_path, b"v2").unwrap();
        let future = SystemTime::now() + Duration::from_secs(5);
        let file = std::fs::File::options()
            .write(true)
            .open(&source_path)
            .unwrap();
        file.set_modified(future).unwrap();
        drop(file);

        let regenerated = std::sync::atomic::AtomicBool::new(false);
        store
            .materialize(&key, &local_source(&source_path), |_, temp| {
                regenerated.store(true, std::sync::atomic::Ordering::SeqCst);
                async move {
                    tokio::fs::write(&temp, b"derived v2").await?;
                    Ok(true)
                }
            })
            .await
            .unwrap();

        assert!(regenerated.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(
            std::fs::read(store.artifact_path(&key)).unwrap(),
            b"derived v2"
        );
    }

    #[tokio::test]
    async fn remote_artifact_without_mtime_stays_fresh() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let source = SourceDescriptor::remote("https://example.com/a.png");
        let key = CacheKey::new("abc-a.png");

        let runs = std::sync::atomic::AtomicUsize::new(0);
        for _ in 0..2 {
            store
                .materialize(&key, &source, |_, temp| {
                    runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    async move {
                        tokio::fs::write(&temp, b"fetched").await?;
                        Ok(true)
                    }
                })
                .await
                .unwrap();
        }

        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn false_from_produce_copies_source_verbatim() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let source_path = dir.path().join("src.png");
        std::fs::write(&source_path, b"original bytes").unwrap();
        let key = CacheKey::new("abc-src.png");

        let path = store
            .materialize(&key, &local_source(&source_path), |_, _| async move {
                Ok(false)
            })
            .await
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"original bytes");
    }

    #[tokio::test]
    async fn passthrough_only_for_public_untransformed_sources() {
        let public = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let store = store_in(&public);

        let public_file = public.path().join("logo.png");
        std::fs::write(&public_file, b"x").unwrap();
        let outside_file = elsewhere.path().join("logo.png");
        std::fs::write(&outside_file, b"x").unwrap();

        let public_source = local_source(&public_file);
        let outside_source = local_source(&outside_file);
        let empty = TransformationSpec::empty();
        let resize =
            TransformationSpec::new(vec![Transformation::new("resize").with_option("width", "1")]);

        assert_eq!(store.passthrough(&public_source, &empty), Some(public_file));
        assert_eq!(store.passthrough(&public_source, &resize), None);
        assert_eq!(store.passthrough(&outside_source, &empty), None);
        assert_eq!(
            store.passthrough(&SourceDescriptor::remote("https://e.com/a.png"), &empty),
            None
        );
    }

    #[tokio::test]
    async fn clear_is_idempotent_and_allows_rewrites() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let source_path = dir.path().join("src.png");
        std::fs::write(&source_path, b"source").unwrap();
        let key = CacheKey::new("abc-src.png");

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        store
            .materialize(&key, &local_source(&source_path), |_, temp| async move {
                tokio::fs::write(&temp, b"derived").await?;
                Ok(true)
            })
            .await
            .unwrap();
        assert_eq!(store.stats().await.unwrap().artifacts, 1);

        store.clear().await.unwrap();
        assert_eq!(store.stats().await.unwrap().artifacts, 0);
    }

    #[tokio::test]
    async fn concurrent_producers_serialize_per_key() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store_in(&dir));
        let source = SourceDescriptor::remote("https://example.com/a.png");
        let key = CacheKey::new("abc-a.png");

        let runs = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let source = source.clone();
                let key = key.clone();
                let runs = runs.clone();
                tokio::spawn(async move {
                    store
                        .materialize(&key, &source, |_, temp| {
                            let runs = runs.clone();
                            async move {
                                runs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                                tokio::time::sleep(Duration::from_millis(5)).await;
                                tokio::fs::write(&temp, b"fetched").await?;
                                Ok(true)
                            }
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        for task in futures_util::future::join_all(tasks).await {
            task.unwrap();
        }

        // Everyone observed the artifact, exactly one produced it.
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(store.stats().await.unwrap().artifacts, 1);
    }

    #[tokio::test]
    async fn relative_path_strips_public_root() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let artifact = store.artifact_path(&CacheKey::new("abc-a.png"));

        assert_eq!(
            store.relative_path(&artifact).unwrap(),
            "/cache/img/abc-a.png"
        );
        assert!(store.relative_path(Path::new("/elsewhere/x")).is_err());
    }
}
