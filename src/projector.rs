//! Weighted projection of multisets onto a key space.
//!
//! A `Projector` turns an iterable of keys into a numeric vector over its
//! `KeySpace`, applying a per-occurrence weighting function. The same
//! primitive also accepts a ready key → coefficient mapping, which is how
//! weight vectors (and not just occurrence vectors) are assembled.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::space::{Key, KeySpace};

/// Projects multisets of keys into the vector space indexed by a `KeySpace`.
#[derive(Clone, Debug)]
pub struct Projector<K> {
    space: KeySpace<K>,
}

impl<K: Key> Projector<K> {
    #[inline]
    pub fn new(space: KeySpace<K>) -> Self {
        Self { space }
    }

    /// Builds the projector and its space in one go.
    pub fn build<I: IntoIterator<Item = K>>(keys: I, silent: bool) -> Self {
        Self::new(KeySpace::build(keys, silent))
    }

    #[inline]
    pub fn space(&self) -> &KeySpace<K> {
        &self.space
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.space.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.space.is_empty()
    }

    /// Occurrence-count vector: each distinct key contributes its raw
    /// multiplicity at its index.
    pub fn project<'a, I>(&self, keys: I) -> Result<Vec<f64>>
    where
        K: 'a,
        I: IntoIterator<Item = &'a K>,
    {
        self.project_with(keys, |_, multiplicity| multiplicity as f64)
    }

    /// Projection with a caller-chosen per-occurrence weight.
    ///
    /// For each distinct key `k` with multiplicity `m`, adds
    /// `weight_fn(k, m)` at `index(k)`. Unknown keys raise `UnknownKey`
    /// unless the space is silent, in which case they are dropped.
    pub fn project_with<'a, I, F>(&self, keys: I, weight_fn: F) -> Result<Vec<f64>>
    where
        K: 'a,
        I: IntoIterator<Item = &'a K>,
        F: Fn(&K, usize) -> f64,
    {
        let mut multiplicities: HashMap<&K, usize> = HashMap::new();
        for key in keys {
            *multiplicities.entry(key).or_insert(0) += 1;
        }
        let mut vector = vec![0.0; self.space.len()];
        for (key, multiplicity) in multiplicities {
            match self.space.get(key) {
                Some(index) => vector[index] += weight_fn(key, multiplicity),
                None if self.space.is_silent() => {}
                None => return Err(Error::UnknownKey(format!("{key:?}"))),
            }
        }
        Ok(vector)
    }

    /// Projection from an explicit key → coefficient mapping.
    ///
    /// The mapping's values are used directly; omitted known keys end up at
    /// zero, so this is a full replacement, never a partial update. Unknown
    /// keys error when `silent` is false and are skipped otherwise.
    pub fn project_map(&self, mapping: &HashMap<K, f64>, silent: bool) -> Result<Vec<f64>> {
        let mut vector = vec![0.0; self.space.len()];
        for (key, &weight) in mapping {
            match self.space.get(key) {
                Some(index) => vector[index] = weight,
                None if silent => {}
                None => return Err(Error::UnknownKey(format!("{key:?}"))),
            }
        }
        Ok(vector)
    }

    /// Inverse view of a vector over this space as a key → coefficient map.
    ///
    /// # Panics
    ///
    /// Panics if the vector length differs from the space size.
    pub fn to_map(&self, vector: &[f64]) -> HashMap<K, f64> {
        assert_eq!(
            vector.len(),
            self.space.len(),
            "vector length must match key space size"
        );
        self.space
            .keys()
            .iter()
            .zip(vector.iter())
            .map(|(key, &weight)| (key.clone(), weight))
            .collect()
    }
}
