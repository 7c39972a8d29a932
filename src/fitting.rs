//! Entry-point facade: a distance on bag collections that learns from
//! oracle claims.
//!
//! `FittingDistance` wires one `Vectorizer` to one distance function. It
//! computes distances between arbitrary collections of the initial bags and
//! adjusts item and bag weights through `fit` so that claimed distances move
//! into their target intervals.

use std::collections::HashMap;

use crate::calibrate::{CalibrationParams, CalibrationTarget, Calibrator, OracleClaim};
use crate::distance::DistanceKind;
use crate::error::Result;
use crate::space::{Bag, Key};
use crate::vectorize::{Vectorizer, VectorizerBuilder};

/// Configures and builds a `FittingDistance`.
#[derive(Clone, Debug)]
pub struct FittingDistanceBuilder<K: Key> {
    vectorizer: VectorizerBuilder<K>,
    distance: DistanceKind,
}

impl<K: Key> Default for FittingDistanceBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key> FittingDistanceBuilder<K> {
    pub fn new() -> Self {
        Self {
            vectorizer: VectorizerBuilder::new(),
            distance: DistanceKind::default(),
        }
    }

    pub fn with_distance(mut self, distance: DistanceKind) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_tfidf(mut self, tfidf: bool) -> Self {
        self.vectorizer = self.vectorizer.with_tfidf(tfidf);
        self
    }

    pub fn with_item_weights(mut self, item_weights: HashMap<K, f64>) -> Self {
        self.vectorizer = self.vectorizer.with_item_weights(item_weights);
        self
    }

    pub fn with_bag_weights(mut self, bag_weights: HashMap<Bag<K>, f64>) -> Self {
        self.vectorizer = self.vectorizer.with_bag_weights(bag_weights);
        self
    }

    pub fn build(self, bags: &[Bag<K>]) -> Result<FittingDistance<K>> {
        Ok(FittingDistance {
            vectorizer: self.vectorizer.build(bags)?,
            distance: self.distance,
        })
    }
}

/// A calibratable distance over collections of bags.
///
/// # Examples
///
/// ```
/// use fitspace::fitting::FittingDistance;
/// use fitspace::space::Bag;
///
/// let bags: Vec<Bag<&str>> = vec![
///     ["x", "y", "x"].into_iter().collect(),
///     ["y", "y", "y"].into_iter().collect(),
/// ];
/// let fd = FittingDistance::new(&bags).unwrap();
/// let d = fd.distance(&bags[..1], &bags[..1]).unwrap();
/// assert!(d.abs() < 1e-12);
/// ```
#[derive(Clone, Debug)]
pub struct FittingDistance<K: Key> {
    vectorizer: Vectorizer<K>,
    distance: DistanceKind,
}

impl<K: Key> FittingDistance<K> {
    /// Cosine distance over flat weights; use the builder for anything else.
    pub fn new(bags: &[Bag<K>]) -> Result<Self> {
        Self::builder().build(bags)
    }

    pub fn builder() -> FittingDistanceBuilder<K> {
        FittingDistanceBuilder::new()
    }

    /// Distance between the vectorizations of the two collections.
    pub fn distance(&self, collection0: &[Bag<K>], collection1: &[Bag<K>]) -> Result<f64> {
        let v0 = self.vectorizer.project(collection0)?;
        let v1 = self.vectorizer.project(collection1)?;
        self.distance.distance(&v0, &v1)
    }

    /// Calibrates the weights against the claims with explicit
    /// hyperparameters.
    pub fn fit(&mut self, claims: &[OracleClaim<K>], params: CalibrationParams) -> Result<()> {
        let targets: Vec<CalibrationTarget<K>> = claims
            .iter()
            .map(|claim| CalibrationTarget {
                distance: self.distance,
                claim: claim.clone(),
            })
            .collect();
        Calibrator::new(params).fit(&mut self.vectorizer, &targets)
    }

    /// `fit` with the default hyperparameters (speed 0.3, ratio 0.5, 6 steps).
    pub fn fit_default(&mut self, claims: &[OracleClaim<K>]) -> Result<()> {
        self.fit(claims, CalibrationParams::default())
    }

    pub fn get_item_weight(&self, item: &K) -> Result<f64> {
        self.vectorizer.get_item_weight(item)
    }

    pub fn get_bag_weight(&self, bag: &Bag<K>) -> Result<f64> {
        self.vectorizer.get_bag_weight(bag)
    }

    pub fn get_item_weights(&self) -> HashMap<K, f64> {
        self.vectorizer.get_item_weights()
    }

    pub fn get_bag_weights(&self) -> HashMap<Bag<K>, f64> {
        self.vectorizer.get_bag_weights()
    }

    #[inline]
    pub fn vectorizer(&self) -> &Vectorizer<K> {
        &self.vectorizer
    }
}
