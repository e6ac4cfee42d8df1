// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur while validating or solving a damped inversion.
#[derive(Debug, Clone, PartialEq)]
pub enum InversionError {
    /// The regularized normal matrix is singular or too ill-conditioned to factorize.
    SingularMatrix {
        /// The elimination step at which the pivot collapsed.
        pivot: usize,
        /// The pivot value encountered.
        value: f64,
    },
    /// Two inputs disagree on a shared dimension.
    DimensionMismatch {
        /// Which quantity was checked.
        what: &'static str,
        /// The length implied by the forward operator.
        expected: usize,
        /// The length actually supplied.
        got: usize,
    },
    /// The forward operator has no rows or no columns.
    EmptyOperator {
        /// Number of rows (observations).
        nrows: usize,
        /// Number of columns (parameters).
        ncols: usize,
    },
    /// The candidate damping sequence is empty.
    EmptyCandidates,
    /// Damping coefficient is negative or not finite.
    InvalidDamping(f64),
    /// Noise norm is negative or not finite.
    InvalidNoiseNorm(f64),
    /// Pivot tolerance is negative or not finite.
    InvalidTolerance(f64),
    /// An input array holds NaN or infinity.
    NonFiniteValue {
        /// Which input was checked.
        what: &'static str,
        /// The flat (row-major) index of the offending value.
        index: usize,
    },
    /// Any other malformed argument, with a descriptive message.
    InvalidArgument(String),
    /// The worker pool for a parallel search could not be built.
    ThreadPool(String),
}

impl InversionError {
    /// Whether this error was raised by input validation, before any numeric work.
    pub fn is_invalid_argument(&self) -> bool {
        !matches!(
            self,
            InversionError::SingularMatrix { .. } | InversionError::ThreadPool(_)
        )
    }
}

impl fmt::Display for InversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InversionError::SingularMatrix { pivot, value } => {
                write!(
                    f,
                    "singular normal matrix: pivot {} is {:e} (increase the damping)",
                    pivot, value
                )
            }
            InversionError::DimensionMismatch {
                what,
                expected,
                got,
            } => {
                write!(
                    f,
                    "dimension mismatch: {} has length {} but the operator expects {}",
                    what, got, expected
                )
            }
            InversionError::EmptyOperator { nrows, ncols } => {
                write!(
                    f,
                    "empty forward operator: shape {}x{} (both must be >= 1)",
                    nrows, ncols
                )
            }
            InversionError::EmptyCandidates => {
                write!(f, "no candidate damping coefficients were supplied")
            }
            InversionError::InvalidDamping(eps) => {
                write!(
                    f,
                    "invalid damping coefficient: {} (must be non-negative and finite)",
                    eps
                )
            }
            InversionError::InvalidNoiseNorm(norm) => {
                write!(
                    f,
                    "invalid noise norm: {} (must be non-negative and finite)",
                    norm
                )
            }
            InversionError::InvalidTolerance(tol) => {
                write!(
                    f,
                    "invalid pivot tolerance: {} (must be non-negative and finite)",
                    tol
                )
            }
            InversionError::NonFiniteValue { what, index } => {
                write!(f, "non-finite value in {} at index {}", what, index)
            }
            InversionError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            InversionError::ThreadPool(msg) => write!(f, "thread pool error: {}", msg),
        }
    }
}

impl std::error::Error for InversionError {}

/// Convenience type alias for Results with InversionError.
pub type Result<T> = std::result::Result<T, InversionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_singular_matrix() {
        let e = InversionError::SingularMatrix {
            pivot: 1,
            value: 0.0,
        };
        assert_eq!(
            e.to_string(),
            "singular normal matrix: pivot 1 is 0e0 (increase the damping)"
        );
    }

    #[test]
    fn display_dimension_mismatch() {
        let e = InversionError::DimensionMismatch {
            what: "data",
            expected: 5,
            got: 4,
        };
        assert_eq!(
            e.to_string(),
            "dimension mismatch: data has length 4 but the operator expects 5"
        );
    }

    #[test]
    fn display_invalid_damping() {
        let e = InversionError::InvalidDamping(-1.0);
        assert_eq!(
            e.to_string(),
            "invalid damping coefficient: -1 (must be non-negative and finite)"
        );
    }

    #[test]
    fn display_empty_candidates() {
        assert_eq!(
            InversionError::EmptyCandidates.to_string(),
            "no candidate damping coefficients were supplied"
        );
    }

    #[test]
    fn display_non_finite() {
        let e = InversionError::NonFiniteValue {
            what: "operator",
            index: 7,
        };
        assert_eq!(e.to_string(), "non-finite value in operator at index 7");
    }

    #[test]
    fn classification() {
        assert!(InversionError::EmptyCandidates.is_invalid_argument());
        assert!(InversionError::InvalidNoiseNorm(-0.5).is_invalid_argument());
        assert!(InversionError::DimensionMismatch {
            what: "data",
            expected: 1,
            got: 2
        }
        .is_invalid_argument());
        assert!(!InversionError::SingularMatrix {
            pivot: 0,
            value: 0.0
        }
        .is_invalid_argument());
        assert!(!InversionError::ThreadPool("boom".to_string()).is_invalid_argument());
    }
}
