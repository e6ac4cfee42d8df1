// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::core::{residual, squared_norm, LinearProblem};
use crate::error::{InversionError, Result};
use crate::factor::Factorization;
use crate::solver::{check_damping, DampedSolver};

/// Diagnostics for one evaluated damping candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    /// Position of the candidate in the supplied sequence.
    pub index: usize,
    /// The damping coefficient.
    pub epsilon: f64,
    /// Squared data misfit `||d - G m_est||^2`.
    pub misfit: f64,
    /// Euclidean norm of the damped estimate, `||m_est||`.
    pub model_norm: f64,
    /// Discrepancy score `|misfit - noise_norm^2|`.
    pub score: f64,
}

/// Result of an optimal-damping search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The selected damping coefficient.
    pub epsilon: f64,
    /// Index of the selected candidate in the supplied sequence.
    pub index: usize,
    /// The damped estimate at the selected coefficient.
    pub model: Array1<f64>,
    /// Every candidate's diagnostics, in the supplied order.
    pub candidates: Vec<CandidateScore>,
}

/// Discrepancy-principle search over a sequence of damping coefficients.
///
/// Each candidate ε is scored by `|residual(d, G, m_est(ε)) - noise_norm^2|`
/// and the lowest score wins. On ties the earliest candidate in the supplied
/// order is kept, whether the candidates were evaluated sequentially or in
/// parallel.
pub struct EpsilonSearch<'a> {
    problem: LinearProblem<'a>,
    solver: DampedSolver,
    num_threads: Option<usize>,
}

impl<'a> EpsilonSearch<'a> {
    /// Create a search for the forward operator `operator` and observations `data`.
    ///
    /// # Errors
    /// Returns an error if the operator and data fail validation
    /// (see [`LinearProblem::new`]).
    pub fn new(operator: ArrayView2<'a, f64>, data: ArrayView1<'a, f64>) -> Result<Self> {
        let problem = LinearProblem::new(operator, data)?;
        let solver = DampedSolver::from_problem(&problem);
        Ok(EpsilonSearch {
            problem,
            solver,
            num_threads: None,
        })
    }

    /// Set the number of worker threads (builder method).
    /// If not specified, defaults to the number of available CPU cores.
    ///
    /// With `threads` equal to 1 the candidates are evaluated on the calling thread.
    ///
    /// # Errors
    /// Returns an error if `threads` is zero.
    pub fn with_threads(mut self, threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(InversionError::InvalidArgument(
                "thread count must be at least 1".to_string(),
            ));
        }
        self.num_threads = Some(threads);
        Ok(self)
    }

    /// Select the dense factorization used for every candidate (builder method).
    pub fn with_factorization(mut self, factorization: Factorization) -> Self {
        self.solver = self.solver.with_factorization(factorization);
        self
    }

    /// Override the pivot singularity threshold (builder method).
    ///
    /// # Errors
    /// Returns an error if `tolerance` is negative or not finite.
    pub fn with_pivot_tolerance(mut self, tolerance: f64) -> Result<Self> {
        self.solver = self.solver.with_pivot_tolerance(tolerance)?;
        Ok(self)
    }

    /// The underlying damped solver.
    pub fn solver(&self) -> &DampedSolver {
        &self.solver
    }

    /// Evaluate every candidate and select the best one.
    ///
    /// # Errors
    /// Returns [`InversionError::EmptyCandidates`] for an empty sequence,
    /// [`InversionError::InvalidDamping`] or [`InversionError::InvalidNoiseNorm`]
    /// for invalid scalars (all checked before any solve), and otherwise the
    /// first failing solve in candidate order. Failing candidates are never skipped.
    pub fn run(&self, epsilon_values: &[f64], noise_norm: f64) -> Result<SearchOutcome> {
        validate_candidates(epsilon_values, noise_norm)?;
        let target = noise_norm * noise_norm;

        let num_threads = self.get_num_threads().min(epsilon_values.len());
        let evaluated: Vec<Result<(CandidateScore, Array1<f64>)>> = if num_threads <= 1 {
            let mut out = Vec::with_capacity(epsilon_values.len());
            for (index, &epsilon) in epsilon_values.iter().enumerate() {
                let result = self.evaluate(index, epsilon, target);
                let failed = result.is_err();
                out.push(result);
                if failed {
                    break;
                }
            }
            out
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build()
                .map_err(|e| InversionError::ThreadPool(e.to_string()))?;
            pool.install(|| {
                epsilon_values
                    .par_iter()
                    .enumerate()
                    .map(|(index, &epsilon)| self.evaluate(index, epsilon, target))
                    .collect()
            })
        };

        // Merge in original order: first error wins, then first minimum score.
        let mut candidates = Vec::with_capacity(evaluated.len());
        let mut best: Option<(usize, f64, Array1<f64>)> = None;
        for result in evaluated {
            let (candidate, model) = result?;
            let key = if candidate.score.is_nan() {
                f64::INFINITY
            } else {
                candidate.score
            };
            if best.as_ref().map_or(true, |(_, best_key, _)| key < *best_key) {
                best = Some((candidate.index, key, model));
            }
            candidates.push(candidate);
        }

        let (index, _, model) = best.ok_or(InversionError::EmptyCandidates)?;
        let epsilon = epsilon_values[index];
        log::debug!(
            "selected epsilon {} (candidate {} of {}), score {:e}",
            epsilon,
            index,
            epsilon_values.len(),
            candidates[index].score
        );

        Ok(SearchOutcome {
            epsilon,
            index,
            model,
            candidates,
        })
    }

    fn evaluate(
        &self,
        index: usize,
        epsilon: f64,
        target: f64,
    ) -> Result<(CandidateScore, Array1<f64>)> {
        let model = self.solver.solve(epsilon).inspect_err(|e| {
            log::debug!("candidate {} (epsilon {}) failed: {}", index, epsilon, e);
        })?;
        let misfit = residual(self.problem.data(), self.problem.operator(), model.view())?;
        let score = (misfit - target).abs();
        log::debug!(
            "candidate {}: epsilon {} misfit {:e} score {:e}",
            index,
            epsilon,
            misfit,
            score
        );
        let candidate = CandidateScore {
            index,
            epsilon,
            misfit,
            model_norm: squared_norm(model.view()).sqrt(),
            score,
        };
        Ok((candidate, model))
    }

    fn get_num_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Select the damping coefficient whose damped estimate has a squared misfit
/// closest to `noise_norm^2`.
///
/// Candidates are evaluated sequentially in the supplied order and ties go to
/// the earliest one. The returned value is always a member of `epsilon_values`.
///
/// # Errors
/// See [`EpsilonSearch::run`]; input validation happens before any solve.
pub fn find_optimal_epsilon<'a>(
    operator: ArrayView2<'a, f64>,
    data: ArrayView1<'a, f64>,
    epsilon_values: &[f64],
    noise_norm: f64,
) -> Result<f64> {
    let outcome = EpsilonSearch::new(operator, data)?
        .with_threads(1)?
        .run(epsilon_values, noise_norm)?;
    Ok(outcome.epsilon)
}

/// `count` damping coefficients spaced evenly in log10 from `10^start_exp`
/// to `10^stop_exp` inclusive.
///
/// # Errors
/// Returns an error if `count` is zero or either exponent is not finite.
pub fn log_spaced_epsilons(start_exp: f64, stop_exp: f64, count: usize) -> Result<Vec<f64>> {
    if count == 0 {
        return Err(InversionError::InvalidArgument(
            "log-spaced grid needs at least one value".to_string(),
        ));
    }
    if !start_exp.is_finite() || !stop_exp.is_finite() {
        return Err(InversionError::InvalidArgument(format!(
            "log-spaced grid exponents must be finite, got {} and {}",
            start_exp, stop_exp
        )));
    }
    if count == 1 {
        return Ok(vec![10f64.powf(start_exp)]);
    }
    let step = (stop_exp - start_exp) / (count - 1) as f64;
    Ok((0..count)
        .map(|i| 10f64.powf(start_exp + step * i as f64))
        .collect())
}

/// Expected L2 norm of `n` independent errors with standard deviation `sigma`,
/// i.e. `sigma * sqrt(n)`. Suitable as the `noise_norm` target of a search.
///
/// # Errors
/// Returns an error if `sigma` is negative or not finite.
pub fn expected_noise_norm(sigma: f64, n: usize) -> Result<f64> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(InversionError::InvalidArgument(format!(
            "noise standard deviation must be non-negative and finite, got {}",
            sigma
        )));
    }
    Ok(sigma * (n as f64).sqrt())
}

fn validate_candidates(epsilon_values: &[f64], noise_norm: f64) -> Result<()> {
    if epsilon_values.is_empty() {
        return Err(InversionError::EmptyCandidates);
    }
    if !noise_norm.is_finite() || noise_norm < 0.0 {
        return Err(InversionError::InvalidNoiseNorm(noise_norm));
    }
    for &epsilon in epsilon_values {
        check_damping(epsilon)?;
    }
    Ok(())
}
