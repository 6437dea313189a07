//! Insertion-ordered map that allows repeated keys.
//!
//! Entries are stored as a sequence of `(key, value)` pairs; a side index
//! maps each key to the positions of its entries so lookups do not scan the
//! whole sequence.

use std::collections::HashMap;

/// Ordered multi-valued map used for headers and form fields.
///
/// ```
/// use datakit_transport::MultiMap;
///
/// let mut headers = MultiMap::new();
/// headers.insert("Accept", "application/json");
/// headers.insert("X-Tag", "a");
/// headers.insert("X-Tag", "b");
///
/// assert_eq!(headers.get("X-Tag"), Some("a"));
/// assert_eq!(headers.get_all("X-Tag"), vec!["a", "b"]);
/// assert_eq!(headers.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, Vec<usize>>,
}

impl MultiMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value, keeping any earlier values for the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.index
            .entry(key.clone())
            .or_default()
            .push(self.entries.len());
        self.entries.push((key, value.into()));
    }

    /// Returns the first value inserted for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        let first = *self.index.get(key)?.first()?;
        Some(self.entries[first].1.as_str())
    }

    /// Returns every value for `key`, in insertion order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.index
            .get(key)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&i| self.entries[i].1.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterates over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterates over distinct keys in order of first insertion.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, (key, _))| self.index.get(key).and_then(|p| p.first()) == Some(i))
            .map(|(_, (key, _))| key.as_str())
    }

    /// Number of entries, counting repeated keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MultiMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MultiMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for MultiMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order_across_keys() {
        let map: MultiMap = [("b", "1"), ("a", "2"), ("b", "3")].into_iter().collect();
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, [("b", "1"), ("a", "2"), ("b", "3")]);
        assert_eq!(map.keys().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn missing_key() {
        let map = MultiMap::new();
        assert_eq!(map.get("nope"), None);
        assert!(map.get_all("nope").is_empty());
        assert!(!map.contains_key("nope"));
        assert!(map.is_empty());
    }

    #[test]
    fn repeated_values() {
        let mut map = MultiMap::new();
        map.insert("k", "x");
        map.insert("k", "y");
        assert_eq!(map.get("k"), Some("x"));
        assert_eq!(map.get_all("k"), ["x", "y"]);
        assert_eq!(map.len(), 2);
    }
}
