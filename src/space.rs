//! Bags and the indexed key space they live in.
//!
//! A `Bag` is an immutable multiset of items, hashable as a whole so that a
//! bag can itself be indexed like any other key. A `KeySpace` is a bijective
//! mapping from distinguishable keys (items or bags) to dense integer
//! positions, assigned in first-seen order; it is the substrate every vector
//! in this crate is laid over.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};

/// Blanket bound for anything usable as a key: items and bags alike.
pub trait Key: Eq + Hash + Clone + Debug {}

impl<T: Eq + Hash + Clone + Debug> Key for T {}

/// An immutable multiset of items.
///
/// Identity is sequence equality, so two bags built from the same items in
/// the same order compare and hash equal.
///
/// # Examples
///
/// ```
/// use fitspace::space::Bag;
///
/// let bag: Bag<&str> = ["x", "y", "x"].into_iter().collect();
/// assert_eq!(bag.len(), 3);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Bag<K>(Vec<K>);

impl<K> Bag<K> {
    #[inline]
    pub fn new(items: Vec<K>) -> Self {
        Self(items)
    }

    /// Total number of occurrences, multiplicities included.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn items(&self) -> &[K] {
        &self.0
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, K> {
        self.0.iter()
    }
}

impl<K> From<Vec<K>> for Bag<K> {
    fn from(items: Vec<K>) -> Self {
        Self(items)
    }
}

impl<K> FromIterator<K> for Bag<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Bijective key → dense index mapping.
///
/// Indices are consecutive from 0, assigned in first-occurrence order of the
/// initializing collection. Once built the space is frozen: there is no
/// insertion and no removal. A space built in silent mode lets projection
/// paths skip unknown keys as zero contributions; `index_of` stays strict
/// either way so direct lookups always surface a miss.
#[derive(Clone, Debug)]
pub struct KeySpace<K> {
    index: HashMap<K, usize>,
    keys: Vec<K>,
    silent: bool,
}

impl<K: Key> KeySpace<K> {
    /// Builds the space from a key collection, deduplicating while keeping
    /// first-seen order.
    pub fn build<I: IntoIterator<Item = K>>(keys: I, silent: bool) -> Self {
        let mut index = HashMap::new();
        let mut ordered = Vec::new();
        for key in keys {
            if !index.contains_key(&key) {
                index.insert(key.clone(), ordered.len());
                ordered.push(key);
            }
        }
        Self {
            index,
            keys: ordered,
            silent,
        }
    }

    /// Number of distinct keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in index order, so `keys()[i]` is the key at position `i`.
    #[inline]
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Raw lookup, `None` when the key is not part of the space.
    #[inline]
    pub fn get(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Strict lookup.
    pub fn index_of(&self, key: &K) -> Result<usize> {
        self.get(key)
            .ok_or_else(|| Error::UnknownKey(format!("{key:?}")))
    }

    /// Whether projection paths over this space drop unknown keys instead of
    /// failing.
    #[inline]
    pub fn is_silent(&self) -> bool {
        self.silent
    }
}
