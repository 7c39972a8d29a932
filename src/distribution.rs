//! Finite-support probability distribution with memoized moments.
//!
//! Constructed fresh per distance evaluation and discarded after use; the
//! moment cache only lives as long as the instance.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Parallel sequences of values and probabilities.
///
/// Probabilities are nonnegative and sum to 1 up to floating tolerance.
#[derive(Debug)]
pub struct Distribution {
    values: Vec<f64>,
    probabilities: Vec<f64>,
    moments: RefCell<HashMap<u32, f64>>,
}

impl Distribution {
    /// Builds a distribution from parallel values and probabilities.
    ///
    /// Fails with `ShapeMismatch` when the lengths differ.
    pub fn new(values: Vec<f64>, probabilities: Vec<f64>) -> Result<Self> {
        if values.len() != probabilities.len() {
            return Err(Error::ShapeMismatch {
                values: values.len(),
                probabilities: probabilities.len(),
            });
        }
        debug_assert!(
            probabilities.iter().all(|&p| p >= 0.0),
            "probabilities must be nonnegative"
        );
        debug_assert!(
            (probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9,
            "probabilities must sum to 1"
        );
        Ok(Self {
            values,
            probabilities,
            moments: RefCell::new(HashMap::new()),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Moment of the given order, `Σ p_i · v_i^order`.
    ///
    /// Zero-probability points contribute nothing, whatever their value;
    /// this keeps `0 · (±inf)` out of the sum.
    pub fn moment(&self, order: u32) -> f64 {
        if let Some(&cached) = self.moments.borrow().get(&order) {
            return cached;
        }
        let moment = self
            .values
            .iter()
            .zip(self.probabilities.iter())
            .filter(|&(_, &p)| p > 0.0)
            .map(|(&v, &p)| p * v.powi(order as i32))
            .sum();
        self.moments.borrow_mut().insert(order, moment);
        moment
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.moment(1)
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        self.moment(2) - self.moment(1).powi(2)
    }
}
