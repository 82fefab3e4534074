use crate::Fraction;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors raised while building a pattern. Queries on a built pattern
/// never fail; all argument validation happens up front.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatternError {
    #[error("factor must be positive, got {0}")]
    InvalidFactor(Fraction),

    #[error("probability must lie in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("invalid range {0} .. {1}")]
    InvalidRange(Fraction, Fraction),

    #[error("count must be at least 1, got {0}")]
    InvalidCount(usize),

    #[error("euclid pulses {pulses} exceed steps {steps}")]
    InvalidEuclid { pulses: usize, steps: usize },
}
