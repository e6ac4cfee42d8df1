// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::error::{InversionError, Result};

/// A validated linear inverse problem `G m ≈ d`.
///
/// Borrows the forward operator `G` (N observations × M parameters) and the
/// observed data `d` (length N) from the caller. Construction checks that both
/// are non-empty, finite, and agree on N, so every later operation can assume
/// consistent shapes.
#[derive(Debug, Clone, Copy)]
pub struct LinearProblem<'a> {
    operator: ArrayView2<'a, f64>,
    data: ArrayView1<'a, f64>,
}

impl<'a> LinearProblem<'a> {
    /// Create a problem from a forward operator and observations.
    ///
    /// # Errors
    /// Returns an error if `operator` has a zero dimension, if the number of
    /// rows differs from `data.len()`, or if either input holds NaN or infinity.
    pub fn new(operator: ArrayView2<'a, f64>, data: ArrayView1<'a, f64>) -> Result<Self> {
        let (nrows, ncols) = operator.dim();
        if nrows == 0 || ncols == 0 {
            return Err(InversionError::EmptyOperator { nrows, ncols });
        }
        if data.len() != nrows {
            return Err(InversionError::DimensionMismatch {
                what: "data",
                expected: nrows,
                got: data.len(),
            });
        }
        check_finite("operator", operator.iter())?;
        check_finite("data", data.iter())?;
        Ok(LinearProblem { operator, data })
    }

    /// The forward operator `G`.
    pub fn operator(&self) -> ArrayView2<'a, f64> {
        self.operator
    }

    /// The observed data `d`.
    pub fn data(&self) -> ArrayView1<'a, f64> {
        self.data
    }

    /// Number of observations (rows of `G`).
    pub fn num_observations(&self) -> usize {
        self.operator.nrows()
    }

    /// Number of model parameters (columns of `G`).
    pub fn num_parameters(&self) -> usize {
        self.operator.ncols()
    }

    /// Predicted data `G m` for a candidate model.
    pub fn predict(&self, model: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        predict(self.operator, model)
    }

    /// Squared data misfit `||d - G m||^2` for a candidate model.
    pub fn misfit(&self, model: ArrayView1<'_, f64>) -> Result<f64> {
        residual(self.data, self.operator, model)
    }
}

/// Apply the forward operator: returns `G m`.
///
/// # Errors
/// Returns an error if `model.len()` differs from the column count of `operator`.
pub fn predict(operator: ArrayView2<'_, f64>, model: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
    if model.len() != operator.ncols() {
        return Err(InversionError::DimensionMismatch {
            what: "model",
            expected: operator.ncols(),
            got: model.len(),
        });
    }
    Ok(operator.dot(&model))
}

/// Squared Euclidean norm of the data misfit, `||d - G m||^2`.
///
/// The result is never negative and is exactly zero when `G m` reproduces `d`.
///
/// # Errors
/// Returns an error if `data` does not match the row count of `operator` or
/// `model` does not match its column count.
pub fn residual(
    data: ArrayView1<'_, f64>,
    operator: ArrayView2<'_, f64>,
    model: ArrayView1<'_, f64>,
) -> Result<f64> {
    if data.len() != operator.nrows() {
        return Err(InversionError::DimensionMismatch {
            what: "data",
            expected: operator.nrows(),
            got: data.len(),
        });
    }
    let predicted = predict(operator, model)?;
    Ok(data
        .iter()
        .zip(predicted.iter())
        .map(|(&obs, &pred)| (obs - pred) * (obs - pred))
        .sum())
}

/// Squared Euclidean norm of a vector.
pub fn squared_norm(v: ArrayView1<'_, f64>) -> f64 {
    v.dot(&v)
}

pub(crate) fn check_finite<'v>(
    what: &'static str,
    values: impl Iterator<Item = &'v f64>,
) -> Result<()> {
    for (index, value) in values.enumerate() {
        if !value.is_finite() {
            return Err(InversionError::NonFiniteValue { what, index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn survey() -> (Array2<f64>, Array1<f64>) {
        let g = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 0.0], [0.0, 2.0]];
        let d = array![3.0, 5.0, 8.0, 6.0, 10.0];
        (g, d)
    }

    #[test]
    fn problem_reports_shape() {
        let (g, d) = survey();
        let problem = LinearProblem::new(g.view(), d.view()).unwrap();
        assert_eq!(problem.num_observations(), 5);
        assert_eq!(problem.num_parameters(), 2);
    }

    #[test]
    fn problem_rejects_row_mismatch() {
        let (g, _) = survey();
        let d = array![1.0, 2.0, 3.0, 4.0];
        let err = LinearProblem::new(g.view(), d.view()).unwrap_err();
        assert_eq!(
            err,
            InversionError::DimensionMismatch {
                what: "data",
                expected: 5,
                got: 4
            }
        );
    }

    #[test]
    fn problem_rejects_empty_operator() {
        let g = Array2::<f64>::zeros((3, 0));
        let d = array![1.0, 2.0, 3.0];
        let err = LinearProblem::new(g.view(), d.view()).unwrap_err();
        assert_eq!(err, InversionError::EmptyOperator { nrows: 3, ncols: 0 });
    }

    #[test]
    fn problem_rejects_nan() {
        let (mut g, d) = survey();
        g[[2, 1]] = f64::NAN;
        let err = LinearProblem::new(g.view(), d.view()).unwrap_err();
        assert_eq!(
            err,
            InversionError::NonFiniteValue {
                what: "operator",
                index: 5
            }
        );
    }

    #[test]
    fn predict_applies_operator() {
        let (g, d) = survey();
        let m = array![3.0, 5.0];
        let pred = predict(g.view(), m.view()).unwrap();
        assert_eq!(pred, d);
    }

    #[test]
    fn predict_rejects_wrong_model_length() {
        let (g, _) = survey();
        let m = array![1.0, 2.0, 3.0];
        assert!(matches!(
            predict(g.view(), m.view()),
            Err(InversionError::DimensionMismatch { what: "model", .. })
        ));
    }

    #[test]
    fn residual_exact_fit_is_zero() {
        let (g, d) = survey();
        let m = array![3.0, 5.0];
        assert_eq!(residual(d.view(), g.view(), m.view()).unwrap(), 0.0);
    }

    #[test]
    fn residual_known_value() {
        let (g, d) = survey();
        // G [0, 0] = 0, so the misfit is ||d||^2
        let m = array![0.0, 0.0];
        let r = residual(d.view(), g.view(), m.view()).unwrap();
        assert_abs_diff_eq!(r, 9.0 + 25.0 + 64.0 + 36.0 + 100.0, epsilon = 1e-12);
    }

    #[test]
    fn misfit_matches_free_function() {
        let (g, d) = survey();
        let problem = LinearProblem::new(g.view(), d.view()).unwrap();
        let m = array![2.5, 4.0];
        assert_eq!(
            problem.misfit(m.view()).unwrap(),
            residual(d.view(), g.view(), m.view()).unwrap()
        );
    }

    #[test]
    fn squared_norm_of_vector() {
        let v = array![3.0, 4.0];
        assert_eq!(squared_norm(v.view()), 25.0);
    }
}
