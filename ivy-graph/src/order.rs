//! An insertion-ordered map.
//!
//! The graph builder and the SCC finder both need deterministic iteration
//! order (the same order the entities were declared in), which a plain
//! `HashMap` doesn't give us. This is a minimal Vec+HashMap combination
//! rather than a dependency, since the only operations we need are
//! "insert preserving first-seen order" and "look up by key".

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<(K, V)>,
}

impl<K: Eq + Hash + Clone, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key -> value`, returning its index. If the key is already
    /// present, the value is overwritten but the original index is kept.
    pub fn insert(&mut self, key: K, value: V) -> usize {
        if let Some(&idx) = self.index.get(&key) {
            self.entries[idx].1 = value;
            idx
        } else {
            let idx = self.entries.len();
            self.index.insert(key.clone(), idx);
            self.entries.push((key, value));
            idx
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if let Some(&idx) = self.index.get(key) {
            Some(&mut self.entries[idx].1)
        } else {
            None
        }
    }

    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn key_at(&self, idx: usize) -> &K {
        &self.entries[idx].0
    }

    pub fn value_at(&self, idx: usize) -> &V {
        &self.entries[idx].1
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order_on_reinsert() {
        let mut m = OrderedMap::new();
        m.insert("b", 1);
        m.insert("a", 2);
        m.insert("b", 3);
        assert_eq!(m.keys().collect::<Vec<_>>(), vec![&"b", &"a"]);
        assert_eq!(*m.get(&"b").unwrap(), 3);
    }
}
