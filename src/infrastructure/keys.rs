//! Cache key derivation.

use sha2::{Digest, Sha256};

use crate::domain::entities::{CacheKey, SourceDescriptor, TransformationSpec};

/// Derives deterministic cache keys from a source identity and an ordered
/// transformation sequence.
///
/// The key is `<digest>-<base filename>`: a fixed-size hex token over the
/// canonical request string, plus the source's base filename so cache
/// directories stay debuggable. Collision freedom is a probabilistic
/// guarantee of the digest, not a hard one.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Builds the key for one (source, transformations) pair.
    ///
    /// Pure and deterministic: option keys iterate in lexicographic order,
    /// and nothing time- or randomness-dependent enters the hash.
    #[must_use]
    pub fn build(source: &SourceDescriptor, transformations: &TransformationSpec) -> CacheKey {
        let mut canonical = source.identity();
        for transformation in transformations {
            canonical.push_str("-transformation=");
            canonical.push_str(&transformation.name);
            for (key, value) in &transformation.options {
                canonical.push('-');
                canonical.push_str(key);
                canonical.push('=');
                canonical.push_str(value);
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = hasher.finalize();

        CacheKey::new(format!(
            "{}-{}",
            hex::encode(&digest[..16]),
            source.base_filename()
        ))
    }
}
