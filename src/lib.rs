//! fitspace: calibratable bag-of-items vectorization and distance fitting.
//!
//! The crate projects collections of discrete bags (multisets of items, e.g.
//! text n-grams) into a shared item-space vector representation with tunable
//! per-item and per-bag weights, applies a pluggable vector distance with
//! closed-form gradients, and fits those weights against supervised interval
//! constraints ("the distance between A and B should lie in `[lo, hi]`").
//!
//! Pipeline: bag collections → [`vectorize::Vectorizer::project`] → vectors
//! → [`distance::DistanceKind`] → scalar distance. The
//! [`calibrate::Calibrator`] closes the loop: it reads current distances,
//! backpropagates the distance gradients through the linear projection, and
//! nudges the weights toward the claimed intervals.
//!
//! # Examples
//!
//! ```
//! use fitspace::calibrate::OracleClaim;
//! use fitspace::fitting::FittingDistance;
//! use fitspace::space::Bag;
//!
//! let bags: Vec<Bag<&str>> = vec![
//!     ["a", "lovely", "text"].into_iter().collect(),
//!     ["another", "lovely", "text"].into_iter().collect(),
//!     ["something", "entirely", "different"].into_iter().collect(),
//! ];
//! let mut fd = FittingDistance::builder()
//!     .with_tfidf(true)
//!     .build(&bags)
//!     .unwrap();
//!
//! let before = fd.distance(&bags[0..1], &bags[1..2]).unwrap();
//!
//! let claim = OracleClaim::new(
//!     (bags[0..1].to_vec(), bags[1..2].to_vec()),
//!     (0.4, 0.5),
//! );
//! fd.fit_default(&[claim]).unwrap();
//!
//! let after = fd.distance(&bags[0..1], &bags[1..2]).unwrap();
//! assert!(after.is_finite() && before.is_finite());
//! ```
//!
//! All operations are single-threaded, synchronous, pure in-memory numeric
//! computation. A `Vectorizer` is single-writer: serialize weight mutation
//! against concurrent projection on the same instance.

pub mod calibrate;
pub mod distance;
pub mod distribution;
pub mod error;
pub mod fitting;
pub mod projector;
pub mod space;
pub mod vectorize;

pub use calibrate::{CalibrationParams, CalibrationTarget, Calibrator, OracleClaim};
pub use distance::DistanceKind;
pub use distribution::Distribution;
pub use error::{Error, Result};
pub use fitting::{FittingDistance, FittingDistanceBuilder};
pub use projector::Projector;
pub use space::{Bag, Key, KeySpace};
pub use vectorize::{Vectorizer, VectorizerBuilder};

#[cfg(test)]
mod tests;
