//! Vector distances with closed-form partial gradients.
//!
//! Both distances share one contract: a scalar `distance(v0, v1) ≥ 0` plus
//! the two partial gradients of that scalar with respect to each argument
//! vector. The second gradient is the first with switched arguments, which
//! both variants exploit.
//!
//! - `Cosine`: `1 − v0·v1 / (‖v0‖‖v1‖)`.
//! - `JensenShannon`: renormalizes each argument to a probability
//!   distribution and returns the square root of their Jensen-Shannon
//!   divergence, the mean of the log-likelihood-ratio variable against the
//!   50/50 mixture. The square root makes it a metric.
//!
//! An all-zero argument is a precondition violation and fails with
//! `DegenerateInput` instead of silently producing NaN.

use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::error::{Error, Result};

/// Floor under which a distance is treated as exactly zero when it divides a
/// gradient (removable singularity of the Jensen-Shannon gradient).
pub const DISTANCE_FLOOR: f64 = 1e-12;

/// The available distance functions.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DistanceKind {
    #[default]
    Cosine,
    JensenShannon,
}

impl DistanceKind {
    /// Distance between two vectors of the same length.
    ///
    /// # Examples
    ///
    /// ```
    /// use fitspace::distance::DistanceKind;
    ///
    /// let d = DistanceKind::Cosine.distance(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
    /// assert!((d - 1.0).abs() < 1e-12);
    /// ```
    pub fn distance(&self, v0: &[f64], v1: &[f64]) -> Result<f64> {
        assert_eq!(v0.len(), v1.len(), "vector length mismatch");
        match self {
            DistanceKind::Cosine => cosine_distance(v0, v1),
            DistanceKind::JensenShannon => jensen_shannon_distance(v0, v1),
        }
    }

    /// Partial gradient of the distance with respect to the first argument.
    pub fn gradient_wrt_first(&self, v0: &[f64], v1: &[f64]) -> Result<Vec<f64>> {
        assert_eq!(v0.len(), v1.len(), "vector length mismatch");
        match self {
            DistanceKind::Cosine => cosine_gradient(v0, v1),
            DistanceKind::JensenShannon => jensen_shannon_gradient(v0, v1),
        }
    }

    /// Partial gradient with respect to the second argument, by symmetry.
    #[inline]
    pub fn gradient_wrt_second(&self, v0: &[f64], v1: &[f64]) -> Result<Vec<f64>> {
        self.gradient_wrt_first(v1, v0)
    }
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

fn cosine_distance(v0: &[f64], v1: &[f64]) -> Result<f64> {
    let denom = norm(v0) * norm(v1);
    if denom <= 0.0 {
        return Err(Error::DegenerateInput("cosine distance of a zero vector"));
    }
    Ok(1.0 - dot(v0, v1) / denom)
}

/// Quotient-rule gradient of cosine similarity, negated:
/// `∂d/∂v0 = (v0·v1) v0 / (‖v0‖³‖v1‖) − v1 / (‖v0‖‖v1‖)`.
fn cosine_gradient(v0: &[f64], v1: &[f64]) -> Result<Vec<f64>> {
    let n0 = norm(v0);
    let n1 = norm(v1);
    if n0 <= 0.0 || n1 <= 0.0 {
        return Err(Error::DegenerateInput("cosine gradient of a zero vector"));
    }
    let d = dot(v0, v1);
    Ok(v0
        .iter()
        .zip(v1.iter())
        .map(|(&x0, &x1)| d * x0 / (n0.powi(3) * n1) - x1 / (n0 * n1))
        .collect())
}

/// Renormalizes a nonnegative vector into a probability vector.
fn probabilities_from_vector(v: &[f64]) -> Result<Vec<f64>> {
    if v.iter().any(|&x| x < 0.0) {
        return Err(Error::DegenerateInput(
            "jensen-shannon requires nonnegative coefficients",
        ));
    }
    let sum: f64 = v.iter().sum();
    if sum <= 0.0 {
        return Err(Error::DegenerateInput("jensen-shannon of a zero vector"));
    }
    Ok(v.iter().map(|&x| x / sum).collect())
}

/// `ln p` with the zero-probability case pinned to 0.
///
/// Every use site multiplies the result by a probability that vanishes
/// exactly when `p` does, so the pinned value never reaches the output.
#[inline]
fn information_log(p: f64) -> f64 {
    if p > 0.0 {
        p.ln()
    } else {
        0.0
    }
}

/// The information-gain distribution whose mean is the Jensen-Shannon
/// divergence: log-ratio values against the 50/50 mixture, weighted by half
/// of each probability vector.
fn jensen_shannon_distribution(p0: &[f64], p1: &[f64]) -> Result<Distribution> {
    let mixture: Vec<f64> = p0
        .iter()
        .zip(p1.iter())
        .map(|(&a, &b)| 0.5 * a + 0.5 * b)
        .collect();
    let mut values = Vec::with_capacity(2 * p0.len());
    let mut probabilities = Vec::with_capacity(2 * p0.len());
    for (p, m) in p0.iter().zip(mixture.iter()) {
        values.push(information_log(*p) - information_log(*m));
        probabilities.push(0.5 * p);
    }
    for (p, m) in p1.iter().zip(mixture.iter()) {
        values.push(information_log(*p) - information_log(*m));
        probabilities.push(0.5 * p);
    }
    Distribution::new(values, probabilities)
}

fn jensen_shannon_distance(v0: &[f64], v1: &[f64]) -> Result<f64> {
    let p0 = probabilities_from_vector(v0)?;
    let p1 = probabilities_from_vector(v1)?;
    let distribution = jensen_shannon_distribution(&p0, &p1)?;
    // Floating cancellation can push the mean a hair below zero for
    // near-identical inputs.
    Ok(distribution.mean().max(0.0).sqrt())
}

/// `(ln p0 − ln m) / 4 / d`, the gradient of the square-rooted divergence
/// with respect to the first probability vector.
///
/// At `d → 0` the singularity is removable: identical inputs have a flat
/// optimum, so the gradient is defined as the zero vector there.
fn jensen_shannon_gradient(v0: &[f64], v1: &[f64]) -> Result<Vec<f64>> {
    let p0 = probabilities_from_vector(v0)?;
    let p1 = probabilities_from_vector(v1)?;
    let d = jensen_shannon_distance(v0, v1)?;
    if d < DISTANCE_FLOOR {
        return Ok(vec![0.0; v0.len()]);
    }
    Ok(p0
        .iter()
        .zip(p1.iter())
        .map(|(&a, &b)| {
            let m = 0.5 * a + 0.5 * b;
            (information_log(a) - information_log(m)) / 4.0 / d
        })
        .collect())
}
