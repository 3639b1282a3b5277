//! Keyed record containers with three distinct duplicate policies.
//!
//! Callers pick the policy by picking the operation or type:
//!
//! - [`KeyedIndex::insert`]: a duplicate key is a hard error; used where
//!   uniqueness is an invariant.
//! - [`KeyedIndex::try_add`]: a duplicate key is rejected with `false`
//!   and nothing is mutated; used for speculative insertion.
//! - [`OrderedIndex::add`]: duplicates are diverted to a side bag without
//!   rejecting the insert or disturbing positional order; only the first
//!   occurrence of a key is queryable.

use fxhash::FxHashMap;
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("duplicate key '{key}'")]
pub struct DuplicateKeyError {
    pub key: String,
}

/// Hash-backed index where keys must be unique.
#[derive(Debug, Clone)]
pub struct KeyedIndex<V> {
    map: FxHashMap<String, V>,
}

impl<V> Default for KeyedIndex<V> {
    fn default() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }
}

impl<V> KeyedIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`, failing on a duplicate key.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Result<(), DuplicateKeyError> {
        let key = key.into();
        if self.map.contains_key(&key) {
            return Err(DuplicateKeyError { key });
        }
        self.map.insert(key, value);
        Ok(())
    }

    /// Insert `value` under `key` unless the key is taken; returns whether
    /// the value was inserted.
    pub fn try_add(&mut self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();
        if self.map.contains_key(&key) {
            return false;
        }
        self.map.insert(key, value);
        true
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.map.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.map.iter().map(|(key, value)| (key.as_str(), value))
    }
}

/// Insertion-ordered index that tolerates duplicate keys.
///
/// The first value inserted under a key keeps its position and remains the
/// one returned by [`OrderedIndex::get`]; later values with the same key
/// are collected in the duplicates bag in arrival order.
#[derive(Debug, Clone)]
pub struct OrderedIndex<V> {
    items: IndexMap<String, V>,
    duplicates: Vec<(String, V)>,
}

impl<V> Default for OrderedIndex<V> {
    fn default() -> Self {
        Self {
            items: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<V> OrderedIndex<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if self.items.contains_key(&key) {
            self.duplicates.push((key, value));
        } else {
            self.items.insert(key, value);
        }
    }

    /// First value inserted under `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.items.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.items.get_mut(key)
    }

    /// Values in insertion order, duplicates excluded.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.items.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Later arrivals whose keys were already taken, in arrival order.
    pub fn duplicates(&self) -> impl Iterator<Item = (&str, &V)> {
        self.duplicates
            .iter()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
