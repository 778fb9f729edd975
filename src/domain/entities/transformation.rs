//! Transformation request types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single named transformation with its options.
///
/// Options are held in a `BTreeMap` so they always iterate in lexicographic
/// key order; two equivalent option sets built in different orders hash to
/// the same cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    /// Registry name of the transformation, e.g. `resize`.
    pub name: String,
    /// Scalar options, keyed by name.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Transformation {
    /// Creates a transformation with no options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: BTreeMap::new(),
        }
    }

    /// Adds an option, returning self for chaining.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// An ordered sequence of transformations. Order is significant and part of
/// the cache key; the empty sequence is the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationSpec(Vec<Transformation>);

impl TransformationSpec {
    /// Creates an empty (identity) spec.
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Creates a spec from an ordered list.
    #[must_use]
    pub fn new(transformations: Vec<Transformation>) -> Self {
        Self(transformations)
    }

    /// Returns true when no transformations are requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of transformations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates the transformations in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Transformation> {
        self.0.iter()
    }

    /// Parses a CLI-style spec: `name:k=v,k=v`. Options are optional.
    ///
    /// # Errors
    /// Returns the offending fragment when an option is not `key=value`.
    pub fn parse_entry(entry: &str) -> Result<Transformation, String> {
        let (name, options) = match entry.split_once(':') {
            Some((name, rest)) => (name, Some(rest)),
            None => (entry, None),
        };

        if name.is_empty() {
            return Err(format!("empty transformation name in '{entry}'"));
        }

        let mut transformation = Transformation::new(name);
        if let Some(options) = options {
            for pair in options.split(',').filter(|p| !p.is_empty()) {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("option '{pair}' is not key=value"))?;
                transformation.options.insert(key.to_string(), value.to_string());
            }
        }

        Ok(transformation)
    }
}

impl<'a> IntoIterator for &'a TransformationSpec {
    type Item = &'a Transformation;
    type IntoIter = std::slice::Iter<'a, Transformation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Transformation>> for TransformationSpec {
    fn from(transformations: Vec<Transformation>) -> Self {
        Self::new(transformations)
    }
}
