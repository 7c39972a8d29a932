//! Gradient-based weight calibration against oracle claims.
//!
//! An oracle claim states that the distance between two bag collections
//! should fall inside an interval. The calibrator runs a fixed number of
//! descent rounds over all claims; per round it evaluates each claim under
//! the current weights, skips those already satisfied, and otherwise
//! backpropagates the distance gradient into item-weight and bag-weight
//! space. The step for each weight block is normalized by the squared
//! gradient norm, so `speed` reads as the fraction of the displacement to
//! the nearest interval bound closed per round (in the linear
//! approximation). Weights are clamped at zero and committed through the
//! full-replace setters.
//!
//! Convergence is not guaranteed and there is no stopping criterion beyond
//! the step count; callers wanting a tighter fit rerun with more steps.

use std::collections::HashMap;

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::distance::DistanceKind;
use crate::error::Result;
use crate::space::{Bag, Key};
use crate::vectorize::Vectorizer;

pub const DEFAULT_SPEED: f64 = 0.3;
pub const DEFAULT_RATIO_ITEM_BAG: f64 = 0.5;
pub const DEFAULT_GRADIENT_STEPS: usize = 6;

/// Squared-norm floor under which a gradient block contributes no step.
const GRADIENT_FLOOR: f64 = 1e-12;

/// A supervised example: the distance between the two collections of the
/// pair should lie inside `[interval.0, interval.1]`. Never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct OracleClaim<K: Key> {
    pub pair: (Vec<Bag<K>>, Vec<Bag<K>>),
    pub interval: (f64, f64),
}

impl<K: Key> OracleClaim<K> {
    /// # Panics
    ///
    /// Panics if `interval.0 > interval.1`.
    pub fn new(pair: (Vec<Bag<K>>, Vec<Bag<K>>), interval: (f64, f64)) -> Self {
        assert!(
            interval.0 <= interval.1,
            "claim interval must satisfy lo <= hi, got ({}, {})",
            interval.0,
            interval.1
        );
        Self { pair, interval }
    }
}

/// One calibration unit: a claim evaluated through a specific distance.
#[derive(Clone, Debug)]
pub struct CalibrationTarget<K: Key> {
    pub distance: DistanceKind,
    pub claim: OracleClaim<K>,
}

/// Hyperparameters of the descent.
///
/// - `speed` in (0, 1]: step size, fraction of the gap closed per round.
/// - `ratio_item_bag` in [0, 1]: share of each step spent on item weights,
///   the remainder goes to bag weights.
/// - `steps`: number of full passes over all claims.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CalibrationParams {
    pub speed: f64,
    pub ratio_item_bag: f64,
    pub steps: usize,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            ratio_item_bag: DEFAULT_RATIO_ITEM_BAG,
            steps: DEFAULT_GRADIENT_STEPS,
        }
    }
}

/// Runs the descent rounds against one `Vectorizer`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Calibrator {
    params: CalibrationParams,
}

impl Calibrator {
    pub fn new(params: CalibrationParams) -> Self {
        Self { params }
    }

    /// Adjusts the vectorizer's weights toward satisfying all targets.
    ///
    /// Fail-fast: a projection or distance error on any claim aborts the
    /// whole calibration, leaving the weights at their last committed state.
    pub fn fit<K: Key>(
        &self,
        vectorizer: &mut Vectorizer<K>,
        targets: &[CalibrationTarget<K>],
    ) -> Result<()> {
        info!(
            "Calibrating over {} claims: speed={}, ratio_item_bag={}, steps={}",
            targets.len(),
            self.params.speed,
            self.params.ratio_item_bag,
            self.params.steps
        );
        for step in 0..self.params.steps {
            trace!("Calibration round {}/{}", step + 1, self.params.steps);
            self.round(vectorizer, targets)?;
        }
        info!("Calibration completed");
        Ok(())
    }

    /// One full pass over all claims, accumulating the combined step before
    /// committing.
    fn round<K: Key>(
        &self,
        vectorizer: &mut Vectorizer<K>,
        targets: &[CalibrationTarget<K>],
    ) -> Result<()> {
        let mut item_delta = vec![0.0; vectorizer.n_items()];
        let mut bag_delta = vec![0.0; vectorizer.n_bags()];
        let mut active = 0usize;

        for target in targets {
            let (collection0, collection1) = &target.claim.pair;
            let v0 = vectorizer.project(collection0)?;
            let v1 = vectorizer.project(collection1)?;
            let d = target.distance.distance(&v0, &v1)?;

            let (lo, hi) = target.claim.interval;
            let displacement = if d < lo {
                lo - d
            } else if d > hi {
                hi - d
            } else {
                continue;
            };
            active += 1;

            let g0 = target.distance.gradient_wrt_first(&v0, &v1)?;
            let g1 = target.distance.gradient_wrt_second(&v0, &v1)?;
            let (item_g0, bag_g0) = vectorizer.backpropagate(collection0, &g0)?;
            let (item_g1, bag_g1) = vectorizer.backpropagate(collection1, &g1)?;
            let item_grad = add(&item_g0, &item_g1);
            let bag_grad = add(&bag_g0, &bag_g1);

            let item_scale = self.params.ratio_item_bag * self.params.speed * displacement;
            let bag_scale = (1.0 - self.params.ratio_item_bag) * self.params.speed * displacement;
            accumulate_step(&mut item_delta, &item_grad, item_scale);
            accumulate_step(&mut bag_delta, &bag_grad, bag_scale);

            trace!(
                "Claim evaluated: d={:.6}, interval=({}, {}), displacement={:.6}",
                d,
                lo,
                hi,
                displacement
            );
        }

        if active == 0 {
            debug!("All claims already inside their intervals, round is a no-op");
            return Ok(());
        }
        debug!("Committing step accumulated from {} active claims", active);

        // Clamp at zero, then commit through the full-replace setters.
        let new_item_weights: HashMap<K, f64> = vectorizer
            .items()
            .iter()
            .cloned()
            .zip(
                vectorizer
                    .item_weights()
                    .iter()
                    .zip(item_delta.iter())
                    .map(|(w, d)| (w + d).max(0.0)),
            )
            .collect();
        let new_bag_weights: HashMap<Bag<K>, f64> = vectorizer
            .bags()
            .iter()
            .cloned()
            .zip(
                vectorizer
                    .bag_weights()
                    .iter()
                    .zip(bag_delta.iter())
                    .map(|(w, d)| (w + d).max(0.0)),
            )
            .collect();
        vectorizer.set_item_weights(&new_item_weights, true)?;
        vectorizer.set_bag_weights(&new_bag_weights, false)?;
        Ok(())
    }
}

/// Scales `grad` by `scale / ‖grad‖²` and adds it into `delta`, so the
/// induced distance change is `scale` in the linear approximation.
fn accumulate_step(delta: &mut [f64], grad: &[f64], scale: f64) {
    let norm2: f64 = grad.iter().map(|g| g * g).sum();
    if norm2 <= GRADIENT_FLOOR {
        return;
    }
    for (d, g) in delta.iter_mut().zip(grad.iter()) {
        *d += scale * g / norm2;
    }
}

fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()
}
