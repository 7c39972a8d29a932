//! Crate-wide error taxonomy.
//!
//! Lookup failures surface immediately to the caller; silent-mode projection
//! paths convert a missing key into a zero contribution instead of an error.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A key lookup against a `KeySpace` that does not contain it, outside
    /// silent mode.
    #[error("unknown key: {0}")]
    UnknownKey(String),

    /// Values and probabilities of a `Distribution` have different lengths.
    #[error("length mismatch: {values} values against {probabilities} probabilities")]
    ShapeMismatch { values: usize, probabilities: usize },

    /// A vector argument violates a distance precondition, e.g. an all-zero
    /// vector handed to a distance that renormalizes its inputs.
    #[error("degenerate input: {0}")]
    DegenerateInput(&'static str),

    /// Weight vectors only hold nonnegative coefficients.
    #[error("negative weight {weight} for key {key}")]
    NegativeWeight { key: String, weight: f64 },

    /// A `Vectorizer` cannot be built over zero bags.
    #[error("empty bag collection")]
    EmptyCollection,
}
