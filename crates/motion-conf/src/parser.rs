//! Reads the daemon's native configuration file.

use std::collections::HashMap;
use std::collections::hash_map;
use std::fs;
use std::path::Path;

use crate::error::ParseError;
use crate::extract::{Separator, extract_pairs};
use crate::value::{TypedConfigMap, TypedValue};

/// Raw key to value mapping read from a configuration file.
///
/// The map is built wholesale and has no mutators; reloading a file produces
/// a new instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawConfigMap {
    entries: HashMap<String, String>,
}

impl RawConfigMap {
    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns true when `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no keys were read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the raw pairs in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, String, String> {
        self.entries.iter()
    }

    /// Maps every value through [`TypedValue::from_raw`].
    #[must_use]
    pub fn typed(&self) -> TypedConfigMap {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), TypedValue::from_raw(value)))
            .collect()
    }
}

impl FromIterator<(String, String)> for RawConfigMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RawConfigMap {
    type Item = (&'a String, &'a String);
    type IntoIter = hash_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Parses a configuration file in the daemon's `key value` syntax.
///
/// Bytes that are not valid UTF-8 are replaced rather than rejected; camera
/// names and comments are often written in a legacy encoding.
///
/// # Errors
///
/// Returns [`ParseError::Io`] when the file cannot be read.
pub fn parse(path: &Path) -> Result<RawConfigMap, ParseError> {
    let bytes = fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_str(&String::from_utf8_lossy(&bytes)))
}

/// Parses configuration text already held in memory.
#[must_use]
pub fn parse_str(contents: &str) -> RawConfigMap {
    extract_pairs(contents, Separator::Whitespace).collect()
}
