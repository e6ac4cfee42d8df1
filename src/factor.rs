// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{InversionError, Result};

/// Dense factorization used to solve the regularized normal equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Factorization {
    /// Cholesky `A = L Lᵀ`. Requires a symmetric positive-definite matrix.
    #[default]
    Cholesky,
    /// Gaussian elimination with partial (row) pivoting.
    Lu,
}

/// Default singularity threshold for a square matrix: `n * eps * max_i |A_ii|`.
///
/// A pivot whose magnitude does not exceed this value is treated as zero.
pub fn default_pivot_tolerance(a: ArrayView2<'_, f64>) -> f64 {
    let scale = a.diag().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    a.nrows() as f64 * f64::EPSILON * scale
}

/// Solve `A x = b` with the requested factorization.
///
/// Every kernel in this module rejects a non-square `a` or a `b` whose length
/// differs from `a.nrows()` with [`InversionError::DimensionMismatch`].
pub fn solve_dense(
    kind: Factorization,
    a: ArrayView2<'_, f64>,
    b: ArrayView1<'_, f64>,
    tolerance: f64,
) -> Result<Array1<f64>> {
    check_system(a, b)?;
    match kind {
        Factorization::Cholesky => cholesky_solve(a, b, tolerance),
        Factorization::Lu => lu_solve(a.to_owned(), b.to_owned(), tolerance),
    }
}

/// Solve the symmetric positive-definite system `A x = b` by Cholesky
/// decomposition followed by forward and back substitution.
///
/// Only the lower triangle of `a` is read. Fails with
/// [`InversionError::SingularMatrix`] when a diagonal pivot `A_ii - sum(L_ik^2)`
/// does not exceed `tolerance`.
#[allow(clippy::needless_range_loop)]
pub fn cholesky_solve(
    a: ArrayView2<'_, f64>,
    b: ArrayView1<'_, f64>,
    tolerance: f64,
) -> Result<Array1<f64>> {
    check_system(a, b)?;
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag.is_nan() || diag <= tolerance {
                    log::trace!("cholesky pivot {} collapsed to {:e}", i, diag);
                    return Err(InversionError::SingularMatrix {
                        pivot: i,
                        value: diag,
                    });
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward solve: L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[[i, j]] * y[j];
        }
        y[i] = sum / l[[i, i]];
    }

    // Back solve: Lᵀ x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[[j, i]] * x[j];
        }
        x[i] = sum / l[[i, i]];
    }

    Ok(x)
}

/// Solve the general square system `A x = b` by Gaussian elimination with
/// partial pivoting. Consumes `a` and `b` as scratch space.
///
/// Fails with [`InversionError::SingularMatrix`] when the largest remaining
/// pivot candidate in a column does not exceed `tolerance` in magnitude.
#[allow(clippy::needless_range_loop)]
pub fn lu_solve(mut a: Array2<f64>, mut b: Array1<f64>, tolerance: f64) -> Result<Array1<f64>> {
    check_system(a.view(), b.view())?;
    let n = a.nrows();

    for k in 0..n {
        // Partial pivoting: bring the largest |a_ik| to the diagonal
        let mut pivot_row = k;
        let mut pivot_abs = a[[k, k]].abs();
        for i in (k + 1)..n {
            let v = a[[i, k]].abs();
            if v > pivot_abs {
                pivot_row = i;
                pivot_abs = v;
            }
        }
        if pivot_abs.is_nan() || pivot_abs <= tolerance {
            log::trace!("lu pivot {} collapsed to {:e}", k, pivot_abs);
            return Err(InversionError::SingularMatrix {
                pivot: k,
                value: a[[pivot_row, k]],
            });
        }
        if pivot_row != k {
            for j in 0..n {
                a.swap([k, j], [pivot_row, j]);
            }
            b.swap(k, pivot_row);
        }

        let pivot = a[[k, k]];
        for i in (k + 1)..n {
            let factor = a[[i, k]] / pivot;
            if factor == 0.0 {
                continue;
            }
            a[[i, k]] = 0.0;
            for j in (k + 1)..n {
                a[[i, j]] -= factor * a[[k, j]];
            }
            b[i] -= factor * b[k];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[[i, j]] * x[j];
        }
        x[i] = sum / a[[i, i]];
    }

    Ok(x)
}

fn check_system(a: ArrayView2<'_, f64>, b: ArrayView1<'_, f64>) -> Result<()> {
    if a.ncols() != a.nrows() {
        return Err(InversionError::DimensionMismatch {
            what: "matrix columns",
            expected: a.nrows(),
            got: a.ncols(),
        });
    }
    if b.len() != a.nrows() {
        return Err(InversionError::DimensionMismatch {
            what: "right-hand side",
            expected: a.nrows(),
            got: b.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn cholesky_known_system() {
        // [[4, 2], [2, 3]] x = [2, 1] → x = [0.5, 0]
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];
        let x = cholesky_solve(a.view(), b.view(), 0.0).unwrap();
        assert_abs_diff_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        let b = array![1.0, 1.0];
        let err = cholesky_solve(a.view(), b.view(), 0.0).unwrap_err();
        assert!(matches!(err, InversionError::SingularMatrix { pivot: 1, .. }));
    }

    #[test]
    fn cholesky_rejects_collinear_normal_matrix() {
        // GᵗG for G with columns [1, 2, 3] and [2, 4, 6]
        let a = array![[14.0, 28.0], [28.0, 56.0]];
        let b = array![1.0, 2.0];
        let tol = default_pivot_tolerance(a.view());
        let err = cholesky_solve(a.view(), b.view(), tol).unwrap_err();
        assert!(matches!(err, InversionError::SingularMatrix { pivot: 1, .. }));
    }

    #[test]
    fn lu_needs_pivoting() {
        // Zero in the leading position forces a row swap
        let a = array![[0.0, 1.0], [2.0, 1.0]];
        let b = array![3.0, 5.0];
        let x = lu_solve(a, b, 0.0).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn lu_rejects_singular() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let b = array![1.0, 2.0];
        let err = lu_solve(a, b, 1e-12).unwrap_err();
        assert!(matches!(err, InversionError::SingularMatrix { pivot: 1, .. }));
    }

    #[test]
    fn both_factorizations_agree() {
        let a = array![[6.0, 1.0, 0.5], [1.0, 5.0, 0.2], [0.5, 0.2, 4.0]];
        let b = array![1.0, -2.0, 3.0];
        let tol = default_pivot_tolerance(a.view());
        let xc = solve_dense(Factorization::Cholesky, a.view(), b.view(), tol).unwrap();
        let xl = solve_dense(Factorization::Lu, a.view(), b.view(), tol).unwrap();
        for i in 0..3 {
            assert_abs_diff_eq!(xc[i], xl[i], epsilon = 1e-12);
        }
        let back = a.dot(&xc);
        for i in 0..3 {
            assert_abs_diff_eq!(back[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_short_right_hand_side() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        let b = array![1.0];
        let expected = InversionError::DimensionMismatch {
            what: "right-hand side",
            expected: 2,
            got: 1,
        };
        assert_eq!(lu_solve(a.clone(), b.clone(), 0.0).unwrap_err(), expected);
        assert_eq!(cholesky_solve(a.view(), b.view(), 0.0).unwrap_err(), expected);
        assert_eq!(
            solve_dense(Factorization::Lu, a.view(), b.view(), 0.0).unwrap_err(),
            expected
        );
    }

    #[test]
    fn rejects_non_square_matrix() {
        let a = array![[1.0], [2.0]];
        let b = array![1.0, 2.0];
        let expected = InversionError::DimensionMismatch {
            what: "matrix columns",
            expected: 2,
            got: 1,
        };
        assert_eq!(cholesky_solve(a.view(), b.view(), 0.0).unwrap_err(), expected);
        assert_eq!(lu_solve(a.clone(), b.clone(), 0.0).unwrap_err(), expected);
        assert_eq!(
            solve_dense(Factorization::Cholesky, a.view(), b.view(), 0.0).unwrap_err(),
            expected
        );
    }

    #[test]
    fn default_tolerance_scales_with_diagonal() {
        let a = array![[2.0, 0.0], [0.0, -8.0]];
        assert_eq!(default_pivot_tolerance(a.view()), 2.0 * f64::EPSILON * 8.0);
    }
}
