// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::core::LinearProblem;
use crate::error::{InversionError, Result};
use crate::factor::{default_pivot_tolerance, solve_dense, Factorization};

/// Tikhonov-damped least-squares solver for a fixed `(G, d)` pair.
///
/// Computes `m_est = (GᵗG + ε² I)⁻¹ Gᵗ d`, the minimizer of
/// `||G m - d||^2 + ε^2 ||m||^2`. The products `GᵗG` and `Gᵗd` are formed once
/// at construction, so each [`solve`](DampedSolver::solve) only shifts the
/// diagonal and factorizes an M×M matrix.
///
/// The solver is immutable after construction and can be shared across threads.
#[derive(Debug, Clone)]
pub struct DampedSolver {
    normal: Array2<f64>,
    rhs: Array1<f64>,
    factorization: Factorization,
    pivot_tolerance: Option<f64>,
}

impl DampedSolver {
    /// Create a solver for the forward operator `operator` and observations `data`.
    ///
    /// # Errors
    /// Returns an error if the operator is empty, if its row count differs from
    /// `data.len()`, or if either input holds NaN or infinity.
    pub fn new<'a>(operator: ArrayView2<'a, f64>, data: ArrayView1<'a, f64>) -> Result<Self> {
        let problem = LinearProblem::new(operator, data)?;
        Ok(Self::from_problem(&problem))
    }

    /// Create a solver from an already validated problem.
    pub fn from_problem(problem: &LinearProblem<'_>) -> Self {
        let g = problem.operator();
        let gt = g.t();
        DampedSolver {
            normal: gt.dot(&g),
            rhs: gt.dot(&problem.data()),
            factorization: Factorization::default(),
            pivot_tolerance: None,
        }
    }

    /// Select the dense factorization (builder method). Default is Cholesky.
    pub fn with_factorization(mut self, factorization: Factorization) -> Self {
        self.factorization = factorization;
        self
    }

    /// Override the singularity threshold on factorization pivots (builder method).
    ///
    /// By default the threshold is `M * f64::EPSILON * max_i |A_ii|` of the
    /// regularized normal matrix `A`. It is relative to the largest diagonal
    /// entry, so a badly scaled operator can be reported as singular even
    /// though it is invertible: `G = diag(1e4, 1e-4)` at ε = 0 has a pivot of
    /// `1e-8` against a threshold of about `4.4e-8`. Pass a smaller value (or
    /// `0.0`) to accept such systems, or rescale the columns of `G`.
    ///
    /// # Errors
    /// Returns an error if `tolerance` is negative or not finite.
    pub fn with_pivot_tolerance(mut self, tolerance: f64) -> Result<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(InversionError::InvalidTolerance(tolerance));
        }
        self.pivot_tolerance = Some(tolerance);
        Ok(self)
    }

    /// Number of model parameters M.
    pub fn num_parameters(&self) -> usize {
        self.rhs.len()
    }

    /// The configured factorization.
    pub fn factorization(&self) -> Factorization {
        self.factorization
    }

    /// The undamped normal matrix `GᵗG`.
    pub fn normal_matrix(&self) -> &Array2<f64> {
        &self.normal
    }

    /// The projected data `Gᵗd`.
    pub fn projected_data(&self) -> &Array1<f64> {
        &self.rhs
    }

    /// Compute the damped estimate for damping coefficient `epsilon`.
    ///
    /// # Errors
    /// Returns [`InversionError::InvalidDamping`] if `epsilon` is negative or not
    /// finite, and [`InversionError::SingularMatrix`] if `GᵗG + ε² I` cannot be
    /// factorized. No fallback damping is ever substituted.
    pub fn solve(&self, epsilon: f64) -> Result<Array1<f64>> {
        check_damping(epsilon)?;

        let mut a = self.normal.clone();
        let shift = epsilon * epsilon;
        a.diag_mut().mapv_inplace(|v| v + shift);

        let tolerance = self
            .pivot_tolerance
            .unwrap_or_else(|| default_pivot_tolerance(a.view()));
        solve_dense(self.factorization, a.view(), self.rhs.view(), tolerance)
    }
}

/// Damped least-squares estimate `(GᵗG + ε² I)⁻¹ Gᵗ d`.
///
/// Inputs are validated before any factorization; see [`DampedSolver::solve`]
/// for the failure modes of the solve itself.
pub fn solve<'a>(
    operator: ArrayView2<'a, f64>,
    data: ArrayView1<'a, f64>,
    epsilon: f64,
) -> Result<Array1<f64>> {
    DampedSolver::new(operator, data)?.solve(epsilon)
}

pub(crate) fn check_damping(epsilon: f64) -> Result<()> {
    if !epsilon.is_finite() || epsilon < 0.0 {
        return Err(InversionError::InvalidDamping(epsilon));
    }
    Ok(())
}
