//! Bag-collection vectorization with tunable item and bag weights.
//!
//! A `Vectorizer` owns the sparse incidence structure between items and bags
//! (which items appear in which bags, with multiplicities) plus one weight
//! vector per side. Projecting a bag collection multiplies the incidence
//! matrix by the weighted bag-indicator vector and scales the result by the
//! item weights:
//!
//! `out[i] = w_I[i] · Σ_{bag j in collection} w_B[j] · M[i,j]`
//!
//! The matrix is built once at construction and never grows; only the two
//! weight vectors are mutable, through full-replace setters. The same
//! structure also backpropagates a vector-space gradient into item-weight
//! and bag-weight space, which is what calibration runs on.

use std::collections::HashMap;

use log::{debug, info, trace};
use sprs::{CsMat, TriMat};

use crate::error::{Error, Result};
use crate::projector::Projector;
use crate::space::{Bag, Key};

/// Configures and builds a `Vectorizer`.
///
/// # Examples
///
/// ```
/// use fitspace::space::Bag;
/// use fitspace::vectorize::VectorizerBuilder;
///
/// let bags: Vec<Bag<&str>> = vec![
///     ["x", "y", "x"].into_iter().collect(),
///     ["y", "y", "y"].into_iter().collect(),
/// ];
/// let v = VectorizerBuilder::new().with_tfidf(true).build(&bags).unwrap();
/// assert_eq!(v.n_bags(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct VectorizerBuilder<K: Key> {
    tfidf: bool,
    item_weights: Option<HashMap<K, f64>>,
    bag_weights: Option<HashMap<Bag<K>, f64>>,
}

impl<K: Key> Default for VectorizerBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key> VectorizerBuilder<K> {
    pub fn new() -> Self {
        Self {
            tfidf: false,
            item_weights: None,
            bag_weights: None,
        }
    }

    /// Initialize weights with tf-idf instead of flat ones: bag weight
    /// `1/|bag|`, item weight `ln(n_bags / n_bags_containing_item)`.
    pub fn with_tfidf(mut self, tfidf: bool) -> Self {
        self.tfidf = tfidf;
        self
    }

    /// Explicit initial item weights; takes precedence over tf-idf on the
    /// item side. Items absent from the map start at zero.
    pub fn with_item_weights(mut self, item_weights: HashMap<K, f64>) -> Self {
        self.item_weights = Some(item_weights);
        self
    }

    /// Non-uniform bag importance; takes precedence over tf-idf on the bag
    /// side.
    pub fn with_bag_weights(mut self, bag_weights: HashMap<Bag<K>, f64>) -> Self {
        self.bag_weights = Some(bag_weights);
        self
    }

    /// Builds the incidence matrix and both weight vectors over `bags`.
    pub fn build(self, bags: &[Bag<K>]) -> Result<Vectorizer<K>> {
        if bags.is_empty() {
            return Err(Error::EmptyCollection);
        }
        info!("Building Vectorizer from {} bags", bags.len());
        debug!(
            "Build configuration: tfidf={}, explicit_item_weights={}, explicit_bag_weights={}",
            self.tfidf,
            self.item_weights.is_some(),
            self.bag_weights.is_some()
        );

        // Bag lookups are strict, item lookups silently drop unknown keys.
        let bag_projector = Projector::build(bags.iter().cloned(), false);
        let item_projector = Projector::build(
            bags.iter().flat_map(|bag| bag.items().iter().cloned()),
            true,
        );
        let n_items = item_projector.len();
        let n_bags = bag_projector.len();
        debug!("Key spaces built: {} items, {} distinct bags", n_items, n_bags);

        trace!("Assembling {}x{} incidence matrix", n_items, n_bags);
        let mut triplets = TriMat::new((n_items, n_bags));
        for (j, bag) in bag_projector.space().keys().iter().enumerate() {
            let occurrence_vector = item_projector.project(bag.iter())?;
            for (i, &multiplicity) in occurrence_vector.iter().enumerate() {
                if multiplicity != 0.0 {
                    triplets.add_triplet(i, j, multiplicity);
                }
            }
        }
        let incidence: CsMat<f64> = triplets.to_csr();
        debug!("Incidence matrix assembled with {} nonzeros", incidence.nnz());

        let mut vectorizer = Vectorizer {
            items: item_projector,
            bags: bag_projector,
            incidence,
            item_weights: vec![1.0; n_items],
            bag_weights: vec![1.0; n_bags],
        };

        match self.bag_weights {
            Some(weights) => vectorizer.set_bag_weights(&weights, false)?,
            None if self.tfidf => {
                let weights = vectorizer.tfidf_bag_weights();
                vectorizer.set_bag_weights(&weights, false)?;
            }
            None => {}
        }
        match self.item_weights {
            Some(weights) => vectorizer.set_item_weights(&weights, true)?,
            None if self.tfidf => {
                let weights = vectorizer.tfidf_item_weights();
                vectorizer.set_item_weights(&weights, true)?;
            }
            None => {}
        }

        info!("Vectorizer build completed");
        Ok(vectorizer)
    }
}

/// Projects bag collections into item-space vectors under mutable item and
/// bag weights. See the module docs for the projection formula.
#[derive(Clone, Debug)]
pub struct Vectorizer<K: Key> {
    items: Projector<K>,
    bags: Projector<Bag<K>>,
    /// Items × bags, entry = multiplicity of item i in bag j. Frozen.
    incidence: CsMat<f64>,
    item_weights: Vec<f64>,
    bag_weights: Vec<f64>,
}

impl<K: Key> Vectorizer<K> {
    /// Items in index order.
    #[inline]
    pub fn items(&self) -> &[K] {
        self.items.space().keys()
    }

    /// Distinct bags in index order.
    #[inline]
    pub fn bags(&self) -> &[Bag<K>] {
        self.bags.space().keys()
    }

    #[inline]
    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn n_bags(&self) -> usize {
        self.bags.len()
    }

    /// Current item weights, aligned with `items()`.
    #[inline]
    pub fn item_weights(&self) -> &[f64] {
        &self.item_weights
    }

    /// Current bag weights, aligned with `bags()`.
    #[inline]
    pub fn bag_weights(&self) -> &[f64] {
        &self.bag_weights
    }

    /// Weighted bag combination `indicator ⊙ w_B` for a requested collection.
    ///
    /// The indicator is 1 per present bag whatever its multiplicity in the
    /// request; unknown bags fail with `UnknownKey`.
    fn combined_bag_vector(&self, collection: &[Bag<K>]) -> Result<Vec<f64>> {
        let mut indicator = self.bags.project_with(collection.iter(), |_, _| 1.0)?;
        for (x, w) in indicator.iter_mut().zip(self.bag_weights.iter()) {
            *x *= w;
        }
        Ok(indicator)
    }

    /// Projects a bag collection into item space under the current weights.
    pub fn project(&self, collection: &[Bag<K>]) -> Result<Vec<f64>> {
        let combined = self.combined_bag_vector(collection)?;
        let mut out = vec![0.0; self.n_items()];
        for (i, row) in self.incidence.outer_iterator().enumerate() {
            let s: f64 = row.iter().map(|(j, &m)| m * combined[j]).sum();
            out[i] = self.item_weights[i] * s;
        }
        Ok(out)
    }

    /// Backpropagates an item-space gradient through the linear projection.
    ///
    /// For `out[i] = w_I[i] · s[i]` with `s[i] = Σ_j w_B[j]·M[i,j]`:
    /// - item-weight gradient: `v_grad[i] · s[i]`
    /// - bag-weight gradient: `Σ_i v_grad[i] · w_I[i] · M[i,j]` for bags j
    ///   present in the collection, zero elsewhere.
    pub fn backpropagate(
        &self,
        collection: &[Bag<K>],
        v_grad: &[f64],
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        assert_eq!(
            v_grad.len(),
            self.n_items(),
            "gradient length must match item count"
        );
        let indicator = self.bags.project_with(collection.iter(), |_, _| 1.0)?;
        let mut item_grad = vec![0.0; self.n_items()];
        let mut bag_grad = vec![0.0; self.n_bags()];
        for (i, row) in self.incidence.outer_iterator().enumerate() {
            let mut s = 0.0;
            for (j, &m) in row.iter() {
                if indicator[j] > 0.0 {
                    s += m * self.bag_weights[j];
                    bag_grad[j] += v_grad[i] * self.item_weights[i] * m;
                }
            }
            item_grad[i] = v_grad[i] * s;
        }
        Ok((item_grad, bag_grad))
    }

    /// Replaces the item-weight vector from a mapping. Full replace: omitted
    /// known items drop to zero. `silent` skips unknown items instead of
    /// failing; negative weights are rejected either way.
    pub fn set_item_weights(&mut self, mapping: &HashMap<K, f64>, silent: bool) -> Result<()> {
        check_nonnegative(mapping)?;
        self.item_weights = self.items.project_map(mapping, silent)?;
        trace!("Item weights replaced ({} entries supplied)", mapping.len());
        Ok(())
    }

    /// Replaces the bag-weight vector from a mapping; same contract as
    /// `set_item_weights`.
    pub fn set_bag_weights(&mut self, mapping: &HashMap<Bag<K>, f64>, silent: bool) -> Result<()> {
        check_nonnegative(mapping)?;
        self.bag_weights = self.bags.project_map(mapping, silent)?;
        trace!("Bag weights replaced ({} entries supplied)", mapping.len());
        Ok(())
    }

    /// Weight of one item; strict, unlike silent-mode projection.
    pub fn get_item_weight(&self, item: &K) -> Result<f64> {
        let index = self.items.space().index_of(item)?;
        Ok(self.item_weights[index])
    }

    /// Weight of one bag.
    pub fn get_bag_weight(&self, bag: &Bag<K>) -> Result<f64> {
        let index = self.bags.space().index_of(bag)?;
        Ok(self.bag_weights[index])
    }

    pub fn get_item_weights(&self) -> HashMap<K, f64> {
        self.items.to_map(&self.item_weights)
    }

    pub fn get_bag_weights(&self) -> HashMap<Bag<K>, f64> {
        self.bags.to_map(&self.bag_weights)
    }

    /// Number of bags with at least one occurrence of `item`; 0 for items
    /// outside the space.
    pub fn count_bags_containing_item(&self, item: &K) -> usize {
        match self.items.space().get(item) {
            Some(index) => self
                .incidence
                .outer_view(index)
                .map(|row| row.iter().filter(|&(_, &m)| m != 0.0).count())
                .unwrap_or(0),
            None => 0,
        }
    }

    /// tf side of tf-idf: down-weight long bags by `1/|bag|`.
    ///
    /// An empty bag cannot contribute to any projection, so its weight is
    /// pinned to zero rather than dividing by zero.
    fn tfidf_bag_weights(&self) -> HashMap<Bag<K>, f64> {
        self.bags()
            .iter()
            .map(|bag| {
                let weight = if bag.is_empty() {
                    0.0
                } else {
                    1.0 / bag.len() as f64
                };
                (bag.clone(), weight)
            })
            .collect()
    }

    /// idf side of tf-idf: `ln(n_bags / n_bags_containing_item)`, clamped to
    /// zero when the document frequency is zero.
    fn tfidf_item_weights(&self) -> HashMap<K, f64> {
        let n_bags = self.n_bags();
        self.items()
            .iter()
            .map(|item| {
                let df = self.count_bags_containing_item(item);
                let weight = log_of_ratio_zero_if_null_denominator(n_bags as f64, df as f64);
                (item.clone(), weight)
            })
            .collect()
    }
}

fn check_nonnegative<K: Key>(mapping: &HashMap<K, f64>) -> Result<()> {
    for (key, &weight) in mapping {
        if weight < 0.0 {
            return Err(Error::NegativeWeight {
                key: format!("{key:?}"),
                weight,
            });
        }
    }
    Ok(())
}

pub(crate) fn log_of_ratio_zero_if_null_denominator(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        (numerator / denominator).ln()
    }
}
