use std::fmt::{self, Display};

/// Key/value pair stored by both index structures.
///
/// The key of an [`Entry`] never changes after creation. The value can only be
/// swapped by the owning index through its `update` operation, which keeps the
/// entry at the same position.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn as_pair(&self) -> (&K, &V) {
        (&self.key, &self.value)
    }

    pub fn into_pair(self) -> (K, V) {
        (self.key, self.value)
    }

    pub(crate) fn into_value(self) -> V {
        self.value
    }

    pub(crate) fn replace_value(&mut self, value: V) -> V {
        std::mem::replace(&mut self.value, value)
    }
}

impl<K, V> From<(K, V)> for Entry<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl<K: Display, V: Display> Display for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.key, self.value)
    }
}

/// Returns the position right after the last entry with key `<= key`, so
/// duplicates are appended after the entries already stored under that key.
pub(crate) fn upper_bound<K: Ord, V>(entries: &[Entry<K, V>], key: &K) -> usize {
    entries.partition_point(|e| e.key <= *key)
}

/// Returns the position of the first entry with key `>= key`.
pub(crate) fn lower_bound<K: Ord, V>(entries: &[Entry<K, V>], key: &K) -> usize {
    entries.partition_point(|e| e.key < *key)
}
