// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Damped least-squares inversion for small dense linear inverse problems.
//!
//! Given a forward operator `G` (N observations × M parameters) and observed
//! data `d`, this library computes the Tikhonov-damped estimate
//! `m_est = (GᵗG + ε² I)⁻¹ Gᵗ d` and selects the damping coefficient ε from a
//! candidate grid by the discrepancy principle: the squared misfit
//! `||d - G m_est||^2` should match the expected noise energy `noise_norm^2`.
//!
//! ```
//! use ndarray::array;
//! use tomo_inversion::{find_optimal_epsilon, residual, solve};
//!
//! let g = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 0.0], [0.0, 2.0]];
//! let d = array![3.0, 5.0, 8.0, 6.0, 10.0];
//!
//! let m = solve(g.view(), d.view(), 0.0).unwrap();
//! assert!(residual(d.view(), g.view(), m.view()).unwrap() < 1e-20);
//!
//! let eps = find_optimal_epsilon(g.view(), d.view(), &[0.0, 0.01, 1.0, 10.0], 0.0).unwrap();
//! assert_eq!(eps, 0.0);
//! ```

#![warn(missing_docs)]

/// Problem validation, forward prediction, and misfit evaluation.
pub mod core;
/// Error types for the library.
pub mod error;
/// Dense Cholesky and LU kernels for the normal equations.
pub mod factor;
/// Optimal-damping search by the discrepancy principle.
pub mod search;
/// Tikhonov-damped least-squares solver.
pub mod solver;

pub use crate::core::{predict, residual, LinearProblem};
pub use crate::error::{InversionError, Result};
pub use crate::factor::Factorization;
pub use crate::search::{
    expected_noise_norm, find_optimal_epsilon, log_spaced_epsilons, CandidateScore, EpsilonSearch,
    SearchOutcome,
};
pub use crate::solver::{solve, DampedSolver};
