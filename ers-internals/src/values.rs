//! The string table holding every attribute of an issue.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Mapping from string keys to non-empty string values.
///
/// The table is the serialized form of one issue. Insertion order is not
/// retained and plays no part in equality. Setting an empty value is a no-op,
/// which keeps "absent" and "empty" indistinguishable for readers.
///
/// # Examples
///
/// ```
/// use ers_internals::ValueTable;
///
/// let mut table = ValueTable::new();
/// assert!(table.set("MESSAGE", "disk full"));
/// assert!(!table.set("MESSAGE", ""));
/// assert_eq!(table.value("MESSAGE"), "disk full");
/// assert_eq!(table.value("HOST_NAME"), "");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValueTable {
    entries: HashMap<String, String, FxBuildHasher>,
}

impl ValueTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the value stored for `key`, or the empty string on a miss.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Returns `false` without touching the table when `value` is empty.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.is_empty() {
            return false;
        }
        self.entries.insert(key.into(), value);
        true
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Returns `true` if a value is stored for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the entries sorted by key.
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl<K, V> FromIterator<(K, V)> for ValueTable
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = ValueTable::new();
        for (key, value) in iter {
            table.set(key, value);
        }
        table
    }
}

impl Serialize for ValueTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.sorted())
    }
}

impl<'de> Deserialize<'de> for ValueTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<String, String>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}
