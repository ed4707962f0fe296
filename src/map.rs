//! Ordered map type for struct and map values.
//!
//! [`CfgMap`] wraps an [`IndexMap`] so struct fields keep declaration order
//! and decoded map keys keep source order. The encoder sorts map keys itself,
//! so insertion order only matters for structs.
//!
//! ## Examples
//!
//! ```rust
//! use serde_cfg::{CfgMap, CfgValue};
//!
//! let mut map = CfgMap::new();
//! map.insert("Name".to_string(), CfgValue::from("Alice"));
//! map.insert("Age".to_string(), CfgValue::from(30));
//!
//! assert_eq!(map.len(), 2);
//! assert_eq!(map.get("Name").and_then(|v| v.as_str()), Some("Alice"));
//! ```

use crate::value::CfgValue;
use indexmap::IndexMap;

/// An ordered map of string keys to values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CfgMap(IndexMap<String, CfgValue>);

impl CfgMap {
    /// Creates an empty `CfgMap`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cfg::CfgMap;
    ///
    /// let map = CfgMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        CfgMap(IndexMap::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        CfgMap(IndexMap::with_capacity(capacity))
    }

    /// Inserts a key-value pair, returning the previous value for the key.
    ///
    /// An existing key keeps its position.
    pub fn insert(&mut self, key: String, value: CfgValue) -> Option<CfgValue> {
        self.0.insert(key, value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CfgValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the keys of the map, in insertion order.
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, CfgValue> {
        self.0.keys()
    }

    /// Returns an iterator over the values of the map, in insertion order.
    pub fn values(&self) -> indexmap::map::Values<'_, String, CfgValue> {
        self.0.values()
    }

    /// Returns an iterator over the key-value pairs of the map, in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, CfgValue> {
        self.0.iter()
    }

    /// Key-value pairs in ascending key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_cfg::{CfgMap, CfgValue};
    ///
    /// let map: CfgMap = vec![
    ///     ("b".to_string(), CfgValue::from(2)),
    ///     ("a".to_string(), CfgValue::from(1)),
    /// ]
    /// .into_iter()
    /// .collect();
    /// let keys: Vec<&str> = map.sorted_iter().map(|(k, _)| k.as_str()).collect();
    /// assert_eq!(keys, vec!["a", "b"]);
    /// ```
    pub fn sorted_iter(&self) -> impl Iterator<Item = (&String, &CfgValue)> {
        let mut pairs: Vec<_> = self.0.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        pairs.into_iter()
    }
}

impl IntoIterator for CfgMap {
    type Item = (String, CfgValue);
    type IntoIter = indexmap::map::IntoIter<String, CfgValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CfgMap {
    type Item = (&'a String, &'a CfgValue);
    type IntoIter = indexmap::map::Iter<'a, String, CfgValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, CfgValue)> for CfgMap {
    fn from_iter<T: IntoIterator<Item = (String, CfgValue)>>(iter: T) -> Self {
        CfgMap(IndexMap::from_iter(iter))
    }
}
