//! Generic read-mostly key/value store.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

/// Concurrent map with many readers and an occasional writer.
///
/// Readers never block each other; a writer briefly excludes readers.
/// [`Store::snapshot`] clones the contents so iteration needs no coordination
/// and never observes a torn map. Values are expected to be cheap to clone
/// (typically `Arc`s).
#[derive(Debug, Default)]
pub struct Store<K, V> {
    data: RwLock<HashMap<K, V>>,
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a store seeded with `data`
    #[must_use]
    pub fn new(data: HashMap<K, V>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Value under `key`, if present
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    /// Insert or replace the value under `key`
    pub fn set(&self, key: K, value: V) {
        self.data.write().insert(key, value);
    }

    /// Clone of the current contents
    #[must_use]
    pub fn snapshot(&self) -> HashMap<K, V> {
        self.data.read().clone()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}
